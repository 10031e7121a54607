//! Rate-limited polling engine for the Clash of Clans API
//!
//! Watches a dynamic set of clans, players and clan wars, re-fetching each
//! on a fixed refresh cycle and emitting typed events when something changes.
//! Every outbound request from every loop shares one admission queue, one
//! pacing throttle and one round-robin token rotator, so the configured
//! request rate holds globally.
//!
//! Request path:
//! 1. A sweep loop walks its `WatchSet` in insertion order
//! 2. `Dispatcher` waits for `FetchQueue` admission (FIFO, one in flight)
//! 3. `CredentialRotator` picks the next token
//! 4. The `Fetcher` performs the GET
//! 5. `RequestThrottle` paces the release, then admission passes on
//! 6. The category's `UpdateHandler` diffs the snapshot and emits events
//!
//! A separate maintenance probe flips a flag on 503/200 transitions and emits
//! `MaintenanceStart`/`MaintenanceEnd`.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod handlers;
pub mod maintenance;
pub mod poller;
pub mod queue;
pub mod rotator;
pub mod scheduler;
pub mod sweep;
pub mod telemetry;
pub mod throttle;
pub mod watch_set;

#[cfg(test)]
mod testing;

pub use config::PollerConfig;
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use events::{Emitter, Event, EventReceiver};
pub use handlers::{ClanHandler, Handlers, PlayerHandler, UpdateHandler, WarHandler};
pub use maintenance::MaintenanceProbe;
pub use poller::Poller;
pub use queue::{Admission, FetchQueue};
pub use rotator::CredentialRotator;
pub use scheduler::Scheduler;
pub use sweep::{Category, SweepLoop, next_delay};
pub use throttle::RequestThrottle;
pub use watch_set::{KeyCursor, SweepAbort, WatchSet};
