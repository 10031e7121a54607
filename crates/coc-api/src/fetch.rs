//! The GET primitive used for every upstream request
//!
//! The contract is deliberately flat: `fetch` always resolves to a
//! `FetchResult`, never an error. Callers inspect `ok` and `status`.
//!
//! - transport failure or timeout → `ok = false`, `status = 504`
//! - body that is not JSON → `ok = false`, `status` = the real HTTP status
//! - otherwise → parsed body, `ok = (status == 200)`, `max_age` from the
//!   `Cache-Control` header when present

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL};
use serde_json::Value;
use tracing::{debug, warn};

/// Status reported when the request never produced a response.
pub const TRANSPORT_FAILURE_STATUS: u16 = 504;

/// Outcome of a single GET against the API.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub status: u16,
    /// True iff `status == 200` and the body parsed as JSON.
    pub ok: bool,
    /// Seconds the upstream allows this response to be cached.
    pub max_age: Option<u64>,
    /// Parsed JSON body, `Value::Null` for failure sentinels.
    pub body: Value,
}

impl FetchResult {
    /// Failure sentinel carrying only a status.
    pub fn failed(status: u16) -> Self {
        Self {
            status,
            ok: false,
            max_age: None,
            body: Value::Null,
        }
    }

    /// A parsed response. `ok` is derived from the status.
    pub fn parsed(status: u16, body: Value, max_age: Option<u64>) -> Self {
        Self {
            status,
            ok: status == 200,
            max_age,
            body,
        }
    }
}

/// Abstraction over the HTTP GET used by the poller.
///
/// Uses a boxed future so the poller can hold an `Arc<dyn Fetcher>` and tests
/// can substitute a scripted implementation.
pub trait Fetcher: Send + Sync {
    /// GET `url` with a bearer `token`. Must never panic or error; failures
    /// are reported through the returned `FetchResult`.
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        token: &'a str,
        timeout: Option<Duration>,
    ) -> Pin<Box<dyn Future<Output = FetchResult> + Send + 'a>>;
}

/// reqwest-backed fetcher.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    async fn get(&self, url: &str, token: &str, timeout: Option<Duration>) -> FetchResult {
        let mut request = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(ACCEPT, "application/json");
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(url, error = %e, "upstream request failed");
                return FetchResult::failed(TRANSPORT_FAILURE_STATUS);
            }
        };

        let status = response.status().as_u16();
        let max_age = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age);

        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                warn!(url, status, error = %e, "failed to read upstream body");
                return FetchResult::failed(TRANSPORT_FAILURE_STATUS);
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(body) => FetchResult::parsed(status, body, max_age),
            Err(e) => {
                debug!(url, status, error = %e, "upstream body is not JSON");
                FetchResult::failed(status)
            }
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        token: &'a str,
        timeout: Option<Duration>,
    ) -> Pin<Box<dyn Future<Output = FetchResult> + Send + 'a>> {
        Box::pin(self.get(url, token, timeout))
    }
}

/// Extract `max-age` seconds from a `Cache-Control` value.
///
/// Returns `None` when the directive is missing or malformed.
pub fn parse_max_age(cache_control: &str) -> Option<u64> {
    cache_control
        .split(|c: char| c == ',' || c.is_whitespace())
        .find_map(|directive| directive.strip_prefix("max-age="))
        .and_then(|secs| secs.trim_matches('"').parse().ok())
}
