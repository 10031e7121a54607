//! Per-category sweep loop
//!
//! A pass walks the category's watch set in order, fetching and handling one
//! tag at a time. There is no fan-out within a pass, so its duration is
//! bounded by `tags × (throttle interval + latency)`; `refresh_rate` should
//! be tuned against that.
//!
//! `clear` on the watch set is observed before each fetch. The in-flight
//! fetch finishes and is handled, the rest of the pass is skipped, and the
//! set is cleared once more so tags added during the aborted pass are
//! dropped too.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::events::Emitter;
use crate::handlers::UpdateHandler;
use crate::telemetry;
use crate::watch_set::WatchSet;

/// The three polled entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Clan,
    Player,
    War,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Clan => "clans",
            Category::Player => "players",
            Category::War => "wars",
        }
    }

    /// API path polled for `tag`.
    pub fn path(&self, tag: &str) -> String {
        match self {
            Category::Clan => coc_api::clan_path(tag),
            Category::Player => coc_api::player_path(tag),
            Category::War => coc_api::current_war_path(tag),
        }
    }
}

/// Delay before the next pass: what is left of `refresh_rate`, never negative.
pub fn next_delay(refresh_rate: Duration, elapsed: Duration) -> Duration {
    refresh_rate.saturating_sub(elapsed)
}

/// One category's loop body.
pub struct SweepLoop {
    category: Category,
    watch_set: Arc<WatchSet>,
    dispatcher: Arc<Dispatcher>,
    handler: Arc<dyn UpdateHandler>,
    emitter: Emitter,
    refresh_rate: Duration,
}

impl SweepLoop {
    pub fn new(
        category: Category,
        watch_set: Arc<WatchSet>,
        dispatcher: Arc<Dispatcher>,
        handler: Arc<dyn UpdateHandler>,
        emitter: Emitter,
        refresh_rate: Duration,
    ) -> Self {
        Self {
            category,
            watch_set,
            dispatcher,
            handler,
            emitter,
            refresh_rate,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Run one pass and return how long it took.
    pub async fn run_pass(&self) -> Result<Duration> {
        let started = Instant::now();
        let abort = self.watch_set.abort_signal();
        // A clear issued between passes has already emptied the set.
        abort.reset();

        let mut fetched = 0usize;
        for tag in self.watch_set.keys() {
            if abort.is_raised() {
                break;
            }
            let result = self.dispatcher.dispatch(&self.category.path(&tag)).await?;
            self.handler
                .handle(&self.emitter, &self.watch_set, &tag, result);
            fetched += 1;
        }

        if abort.reset() {
            self.watch_set.clear_entries();
            info!(
                category = self.category.label(),
                fetched, "sweep aborted by clear"
            );
        }
        telemetry::set_watched(self.category.label(), self.watch_set.len());

        let elapsed = started.elapsed();
        debug!(
            category = self.category.label(),
            fetched,
            elapsed_ms = elapsed.as_millis() as u64,
            "sweep pass complete"
        );
        Ok(elapsed)
    }

    /// Run a pass and return the delay until the next one should start.
    pub async fn step(&self) -> Result<Duration> {
        let elapsed = self.run_pass().await?;
        let wait = next_delay(self.refresh_rate, elapsed);
        debug!(
            category = self.category.label(),
            wait_ms = wait.as_millis() as u64,
            "next sweep scheduled"
        );
        Ok(wait)
    }
}
