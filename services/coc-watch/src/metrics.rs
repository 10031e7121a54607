//! Prometheus metrics exposition
//!
//! The engine records through the `metrics` facade (see
//! `coc_poller::telemetry`); this module installs the recorder those calls
//! land in:
//!
//! - `coc_requests_total` (counter): label `status`
//! - `coc_request_duration_seconds` (histogram)
//! - `coc_events_total` (counter): label `event`
//! - `coc_maintenance` (gauge)
//! - `coc_watched_tags` (gauge): label `category`

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Bucket boundaries from 10ms to 30s. API responses are usually well under
/// a second; the tail covers slow maintenance-time answers and timeouts.
const REQUEST_DURATION_BUCKETS: &[f64] = &[
    0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("coc_request_duration_seconds".to_string()),
        REQUEST_DURATION_BUCKETS,
    )
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// `coc_request_duration_seconds` gets explicit buckets so it renders as a
/// histogram (`_bucket` lines) rather than the default summary.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}
