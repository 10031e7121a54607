//! Metric recording for the polling engine
//!
//! Uses the `metrics` facade; the binary decides which recorder (if any) is
//! installed. Without a recorder every call is a no-op.
//!
//! - `coc_requests_total` (counter): label `status`
//! - `coc_request_duration_seconds` (histogram)
//! - `coc_events_total` (counter): label `event`
//! - `coc_maintenance` (gauge): 1 while the API reports maintenance
//! - `coc_watched_tags` (gauge): label `category`

/// Record one completed upstream request.
pub fn record_request(status: u16, duration_secs: f64) {
    metrics::counter!("coc_requests_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("coc_request_duration_seconds").record(duration_secs);
}

pub fn record_event(name: &'static str) {
    metrics::counter!("coc_events_total", "event" => name).increment(1);
}

pub fn set_maintenance(active: bool) {
    metrics::gauge!("coc_maintenance").set(if active { 1.0 } else { 0.0 });
}

pub fn set_watched(category: &'static str, count: usize) {
    metrics::gauge!("coc_watched_tags", "category" => category).set(count as f64);
}
