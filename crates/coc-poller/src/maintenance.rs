//! Maintenance window detection
//!
//! Probes a cheap clan search on a fixed interval. The API answers 503 for
//! the whole duration of a maintenance break; the flag flips on the first 503
//! and back on the first 200. Every other status leaves the flag alone.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::RngExt;
use tracing::{debug, info};

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::events::{Emitter, Event};
use crate::telemetry;

const MAINTENANCE_STATUS: u16 = 503;
const AVAILABLE_STATUS: u16 = 200;

/// Event to emit for a probe `status` given the current flag, if any.
pub fn transition(in_maintenance: bool, status: u16) -> Option<Event> {
    match (in_maintenance, status) {
        (false, MAINTENANCE_STATUS) => Some(Event::MaintenanceStart),
        (true, AVAILABLE_STATUS) => Some(Event::MaintenanceEnd),
        _ => None,
    }
}

pub struct MaintenanceProbe {
    dispatcher: Arc<Dispatcher>,
    emitter: Emitter,
    interval: Duration,
    in_maintenance: AtomicBool,
}

impl MaintenanceProbe {
    pub fn new(dispatcher: Arc<Dispatcher>, emitter: Emitter, interval: Duration) -> Self {
        Self {
            dispatcher,
            emitter,
            interval,
            in_maintenance: AtomicBool::new(false),
        }
    }

    pub fn in_maintenance(&self) -> bool {
        self.in_maintenance.load(Ordering::SeqCst)
    }

    /// Issue one probe and apply the resulting transition.
    pub async fn probe(&self) -> Result<()> {
        let min_members = rand::rng().random_range(10..50);
        let result = self
            .dispatcher
            .dispatch(&coc_api::maintenance_probe_path(min_members))
            .await?;

        let current = self.in_maintenance();
        match transition(current, result.status) {
            Some(event) => {
                let active = event == Event::MaintenanceStart;
                self.in_maintenance.store(active, Ordering::SeqCst);
                telemetry::set_maintenance(active);
                info!(status = result.status, event = event.name(), "maintenance state changed");
                self.emitter.emit(event);
            }
            None => debug!(status = result.status, in_maintenance = current, "maintenance probe"),
        }
        Ok(())
    }

    /// Probe, then ask to be rescheduled after the fixed interval.
    pub async fn step(&self) -> Result<Duration> {
        self.probe().await?;
        Ok(self.interval)
    }
}
