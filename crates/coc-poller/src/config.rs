//! Poller configuration

use std::time::Duration;

use common::Secret;

use crate::error::{Error, Result};

/// Requests per token per second.
pub const DEFAULT_RATE_LIMIT: u32 = 10;

/// Target time between the starts of two passes of the same category.
pub const DEFAULT_REFRESH_RATE: Duration = Duration::from_millis(120_000);

/// Time between maintenance probes.
pub const DEFAULT_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(10);

/// Engine settings. Construct with `PollerConfig::new` and override fields.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// API tokens, used round-robin. Must not be empty.
    pub tokens: Vec<Secret<String>>,
    pub base_url: String,
    /// Per-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub rate_limit: u32,
    pub refresh_rate: Duration,
    pub maintenance_interval: Duration,
}

impl PollerConfig {
    pub fn new(tokens: Vec<Secret<String>>) -> Self {
        Self {
            tokens,
            base_url: coc_api::DEFAULT_BASE_URL.to_string(),
            timeout: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            refresh_rate: DEFAULT_REFRESH_RATE,
            maintenance_interval: DEFAULT_MAINTENANCE_INTERVAL,
        }
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.tokens.is_empty() {
            return Err(Error::Config("at least one API token is required".into()));
        }
        if self.rate_limit == 0 {
            return Err(Error::Config("rate_limit must be greater than 0".into()));
        }
        if self.refresh_rate.is_zero() {
            return Err(Error::Config("refresh_rate must be greater than 0".into()));
        }
        if self.maintenance_interval.is_zero() {
            return Err(Error::Config(
                "maintenance_interval must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
