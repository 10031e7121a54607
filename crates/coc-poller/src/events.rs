//! Typed events and the channel that carries them to consumers
//!
//! A fixed enum replaces free-form listener registration: consumers hold the
//! single `EventReceiver` returned by `Poller::new` and match on variants.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::telemetry;

/// Everything the engine can report.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The API started answering 503.
    MaintenanceStart,
    /// The API answers 200 again after a maintenance window.
    MaintenanceEnd,
    ClanUpdated {
        tag: String,
        previous: Value,
        current: Value,
    },
    ClanMemberJoined {
        clan_tag: String,
        member_tag: String,
    },
    ClanMemberLeft {
        clan_tag: String,
        member_tag: String,
    },
    PlayerUpdated {
        tag: String,
        previous: Value,
        current: Value,
    },
    WarUpdated {
        clan_tag: String,
        previous: Value,
        current: Value,
    },
    /// `state` moved, e.g. `preparation` → `inWar`.
    WarStateChanged {
        clan_tag: String,
        previous_state: String,
        state: String,
    },
}

impl Event {
    /// Stable event name for logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Event::MaintenanceStart => "maintenanceStart",
            Event::MaintenanceEnd => "maintenanceEnd",
            Event::ClanUpdated { .. } => "clanUpdate",
            Event::ClanMemberJoined { .. } => "clanMemberAdd",
            Event::ClanMemberLeft { .. } => "clanMemberRemove",
            Event::PlayerUpdated { .. } => "playerUpdate",
            Event::WarUpdated { .. } => "warUpdate",
            Event::WarStateChanged { .. } => "warStateChange",
        }
    }

    /// Tag of the entity the event concerns, if any.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Event::MaintenanceStart | Event::MaintenanceEnd => None,
            Event::ClanUpdated { tag, .. } | Event::PlayerUpdated { tag, .. } => Some(tag),
            Event::ClanMemberJoined { clan_tag, .. }
            | Event::ClanMemberLeft { clan_tag, .. }
            | Event::WarUpdated { clan_tag, .. }
            | Event::WarStateChanged { clan_tag, .. } => Some(clan_tag),
        }
    }
}

pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Sending half shared by every loop and handler.
///
/// Emission never blocks. Events emitted after the receiver is dropped are
/// discarded.
#[derive(Debug, Clone)]
pub struct Emitter {
    tx: mpsc::UnboundedSender<Event>,
}

impl Emitter {
    pub fn channel() -> (Emitter, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Emitter { tx }, rx)
    }

    pub fn emit(&self, event: Event) {
        let name = event.name();
        telemetry::record_event(name);
        debug!(event = name, tag = event.tag(), "event emitted");
        if self.tx.send(event).is_err() {
            debug!(event = name, "event receiver dropped, event discarded");
        }
    }
}
