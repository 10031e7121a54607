//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! API tokens come from the COC_TOKENS env var or `api.tokens_file`, never
//! from the TOML itself.

use common::Secret;
use coc_poller::PollerConfig;
use coc_poller::config::{DEFAULT_MAINTENANCE_INTERVAL, DEFAULT_RATE_LIMIT, DEFAULT_REFRESH_RATE};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(skip)]
    pub tokens: Vec<Secret<String>>,
}

/// Upstream API settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: Option<u64>,
    pub rate_limit: u32,
    pub refresh_rate_ms: u64,
    pub maintenance_interval_ms: u64,
    /// File with one API token per line (alternative to COC_TOKENS)
    pub tokens_file: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: coc_api::DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            refresh_rate_ms: DEFAULT_REFRESH_RATE.as_millis() as u64,
            maintenance_interval_ms: DEFAULT_MAINTENANCE_INTERVAL.as_millis() as u64,
            tokens_file: None,
        }
    }
}

/// Tags watched from startup
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub clans: Vec<String>,
    pub players: Vec<String>,
    /// Clan tags whose current war is polled
    pub wars: Vec<String>,
}

/// Optional health/metrics listener
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: Option<SocketAddr>,
}

fn parse_tokens<'a>(items: impl Iterator<Item = &'a str>) -> Vec<Secret<String>> {
    items
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.starts_with('#'))
        .map(Secret::from)
        .collect()
}

impl Config {
    /// Load configuration from a TOML file, then resolve API tokens.
    ///
    /// Token resolution order:
    /// 1. COC_TOKENS env var (comma separated)
    /// 2. tokens_file path from config (one per line, `#` comments allowed)
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if !config.api.base_url.starts_with("http://")
            && !config.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.api.base_url
            )));
        }
        if config.api.rate_limit == 0 {
            return Err(common::Error::Config(
                "rate_limit must be greater than 0".into(),
            ));
        }
        if config.api.refresh_rate_ms == 0 {
            return Err(common::Error::Config(
                "refresh_rate_ms must be greater than 0".into(),
            ));
        }
        if config.api.maintenance_interval_ms == 0 {
            return Err(common::Error::Config(
                "maintenance_interval_ms must be greater than 0".into(),
            ));
        }
        if config.api.timeout_secs == Some(0) {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if let Ok(raw) = std::env::var("COC_TOKENS") {
            config.tokens = parse_tokens(raw.split(','));
        } else if let Some(ref tokens_file) = config.api.tokens_file {
            let raw = std::fs::read_to_string(tokens_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read tokens_file {}: {e}",
                    tokens_file.display()
                ))
            })?;
            config.tokens = parse_tokens(raw.lines());
        }

        if config.tokens.is_empty() {
            return Err(common::Error::Config(
                "no API tokens: set COC_TOKENS or api.tokens_file".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("coc-watch.toml")
    }

    pub fn poller_config(&self) -> PollerConfig {
        let mut poller = PollerConfig::new(self.tokens.clone());
        poller.base_url = self.api.base_url.clone();
        poller.timeout = self.api.timeout_secs.map(Duration::from_secs);
        poller.rate_limit = self.api.rate_limit;
        poller.refresh_rate = Duration::from_millis(self.api.refresh_rate_ms);
        poller.maintenance_interval = Duration::from_millis(self.api.maintenance_interval_ms);
        poller
    }
}
