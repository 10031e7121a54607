//! Global request pacing
//!
//! Not a token bucket: there is no burst allowance. Each caller waits out
//! whatever remains of the minimum spacing since the previous release, so the
//! sustained rate approaches but never exceeds `rate_limit × tokens` per
//! second.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum gap between consecutive releases, shared by all loops.
#[derive(Debug)]
pub struct RequestThrottle {
    interval: Duration,
    /// Fair (FIFO) mutex: callers are released in the order they arrived.
    last_release: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    /// `rate_limit` is requests per token per second.
    pub fn new(rate_limit: u32, credential_count: usize) -> Self {
        let per_second = u64::from(rate_limit) * credential_count as u64;
        let interval = if per_second == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(1_000_000_000 / per_second)
        };
        Self {
            interval,
            last_release: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until `interval` has passed since the previous release.
    pub async fn throttle(&self) {
        let mut last = self.last_release.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.interval).await;
        }
        *last = Some(Instant::now());
    }
}
