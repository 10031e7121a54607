//! Test doubles shared by the unit tests

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use coc_api::{FetchResult, Fetcher};
use tokio::time::Instant;

use crate::events::Emitter;
use crate::handlers::UpdateHandler;
use crate::watch_set::WatchSet;

type Responder = Box<dyn Fn(&str, usize) -> FetchResult + Send + Sync>;

/// Fetcher that records every call and answers from a closure.
///
/// The closure receives the URL and the zero-based call number.
pub struct ScriptedFetcher {
    responder: Responder,
    latency: Duration,
    calls: Mutex<Vec<(String, String, Instant)>>,
}

impl ScriptedFetcher {
    pub fn new(responder: impl Fn(&str, usize) -> FetchResult + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 200 with a body echoing the URL and call number.
    pub fn ok() -> Self {
        Self::new(|url, n| {
            FetchResult::parsed(200, serde_json::json!({ "url": url, "call": n }), Some(60))
        })
    }

    pub fn with_status(status: u16) -> Self {
        Self::new(move |_, _| FetchResult::failed(status))
    }

    /// Answer statuses from `statuses` in order, repeating the last one.
    pub fn with_statuses(statuses: Vec<u16>) -> Self {
        Self::new(move |_, n| {
            let status = statuses[n.min(statuses.len() - 1)];
            FetchResult::parsed(status, serde_json::json!({}), None)
        })
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// (url, token) pairs in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, token, _)| (url.clone(), token.clone()))
            .collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, _, at)| *at).collect()
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        token: &'a str,
        _timeout: Option<Duration>,
    ) -> Pin<Box<dyn Future<Output = FetchResult> + Send + 'a>> {
        Box::pin(async move {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((url.to_string(), token.to_string(), Instant::now()));
                calls.len() - 1
            };
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            (self.responder)(url, n)
        })
    }
}

/// Handler that records (tag, result) pairs and otherwise does nothing.
#[derive(Default)]
pub struct RecordingHandler {
    seen: Mutex<Vec<(String, FetchResult)>>,
    on_handle: Option<Box<dyn Fn(&WatchSet) + Send + Sync>>,
}

impl RecordingHandler {
    /// Run `hook` against the watch set on every invocation.
    pub fn with_hook(hook: impl Fn(&WatchSet) + Send + Sync + 'static) -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            on_handle: Some(Box::new(hook)),
        }
    }

    pub fn tags(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn results(&self) -> Vec<FetchResult> {
        self.seen.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }
}

impl UpdateHandler for RecordingHandler {
    fn handle(&self, _emitter: &Emitter, watch_set: &WatchSet, tag: &str, fresh: FetchResult) {
        self.seen.lock().unwrap().push((tag.to_string(), fresh));
        if let Some(hook) = &self.on_handle {
            hook(watch_set);
        }
    }
}
