//! Shared request path for every loop
//!
//! admission → token → fetch → throttle → release. The throttle runs before
//! the admission is released, so the queue itself cannot admit faster than
//! the configured rate.

use std::sync::Arc;
use std::time::Duration;

use coc_api::{FetchResult, Fetcher};
use tokio::time::Instant;
use tracing::debug;

use crate::config::PollerConfig;
use crate::error::Result;
use crate::queue::FetchQueue;
use crate::rotator::CredentialRotator;
use crate::telemetry;
use crate::throttle::RequestThrottle;

/// Owns the queue, throttle and rotator shared by all loops.
pub struct Dispatcher {
    base_url: String,
    timeout: Option<Duration>,
    fetcher: Arc<dyn Fetcher>,
    queue: FetchQueue,
    throttle: RequestThrottle,
    rotator: CredentialRotator,
}

impl Dispatcher {
    pub fn new(config: &PollerConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        config.validate()?;
        let rotator = CredentialRotator::new(config.tokens.clone())?;
        let throttle = RequestThrottle::new(config.rate_limit, rotator.len());
        debug!(
            interval_ms = throttle.interval().as_millis() as u64,
            "request throttle configured"
        );
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            fetcher,
            queue: FetchQueue::new(),
            throttle,
            rotator,
        })
    }

    /// GET `base_url + path` through the global queue.
    ///
    /// Returns the fetch result unchanged; failures are not classified or
    /// retried here. Only fails when the dispatcher has been closed.
    pub async fn dispatch(&self, path: &str) -> Result<FetchResult> {
        let admission = self.queue.wait().await?;
        let token = self.rotator.next();
        let url = format!("{}{}", self.base_url, path);

        let started = Instant::now();
        let result = self.fetcher.fetch(&url, token.expose(), self.timeout).await;
        let elapsed = started.elapsed();

        telemetry::record_request(result.status, elapsed.as_secs_f64());
        debug!(
            path,
            status = result.status,
            ok = result.ok,
            elapsed_ms = elapsed.as_millis() as u64,
            "request completed"
        );

        self.throttle.throttle().await;
        admission.release();
        Ok(result)
    }

    /// Stop admitting requests; pending and future dispatches fail.
    pub fn close(&self) {
        self.queue.close();
    }

    pub fn throttle_interval(&self) -> Duration {
        self.throttle.interval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::ScriptedFetcher;

    fn config(tokens: &[&str]) -> PollerConfig {
        let mut config = PollerConfig::new(tokens.iter().map(|t| (*t).into()).collect());
        config.base_url = "http://api.test/v1/".into();
        config
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_builds_url_and_rotates_tokens() {
        let fetcher = Arc::new(ScriptedFetcher::ok());
        let dispatcher = Dispatcher::new(&config(&["A", "B"]), fetcher.clone()).unwrap();

        dispatcher.dispatch("/clans/%232PP").await.unwrap();
        dispatcher.dispatch("/players/%23999").await.unwrap();
        dispatcher.dispatch("/clans/%232PP").await.unwrap();

        assert_eq!(
            fetcher.calls(),
            vec![
                ("http://api.test/v1/clans/%232PP".to_string(), "A".to_string()),
                ("http://api.test/v1/players/%23999".to_string(), "B".to_string()),
                ("http://api.test/v1/clans/%232PP".to_string(), "A".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_returned_not_raised() {
        let fetcher = Arc::new(ScriptedFetcher::with_status(504));
        let dispatcher = Dispatcher::new(&config(&["A"]), fetcher).unwrap();

        let result = dispatcher.dispatch("/clans/%232PP").await.unwrap();
        assert_eq!(result, FetchResult::failed(504));
    }

    #[tokio::test(start_paused = true)]
    async fn requests_are_paced_globally() {
        let fetcher = Arc::new(ScriptedFetcher::ok());
        let dispatcher = Arc::new(Dispatcher::new(&config(&["A", "B"]), fetcher.clone()).unwrap());
        let interval = dispatcher.throttle_interval();
        assert_eq!(interval, Duration::from_millis(50));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        for i in 0..6 {
            let dispatcher = dispatcher.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                dispatcher.dispatch(&format!("/clans/{i}")).await.unwrap();
                tx.send(Instant::now()).unwrap();
            });
        }
        drop(tx);

        let mut returns = Vec::new();
        while let Some(at) = rx.recv().await {
            returns.push(at);
        }
        assert_eq!(returns.len(), 6);
        for pair in returns.windows(2) {
            assert!(pair[1] - pair[0] >= interval, "gap {:?}", pair[1] - pair[0]);
        }

        // The first release does not wait, so the first two requests may be
        // issued at the same instant. Every later issue follows a paced release.
        let starts = fetcher.call_times();
        assert_eq!(starts.len(), 6);
        for pair in starts[1..].windows(2) {
            assert!(pair[1] - pair[0] >= interval, "gap {:?}", pair[1] - pair[0]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn closed_dispatcher_rejects() {
        let dispatcher = Dispatcher::new(&config(&["A"]), Arc::new(ScriptedFetcher::ok())).unwrap();
        dispatcher.close();
        assert!(matches!(
            dispatcher.dispatch("/clans/%232PP").await,
            Err(Error::Shutdown)
        ));
    }

    #[test]
    fn empty_tokens_rejected_at_construction() {
        let result = Dispatcher::new(&config(&[]), Arc::new(ScriptedFetcher::ok()));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
