//! Media Services request metrics.
//!
//! - Request counters by operation and status
//! - Latency histograms
//! - Redirect counters

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total REST requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "ams_requests_total";

    /// Requests that were replayed against a redirect target.
    pub const REDIRECTS_TOTAL: &str = "ams_redirects_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "ams_latency_seconds";
}

/// Record metrics for a completed request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a followed redirect.
pub fn record_redirect(operation: &str) {
    counter!(
        names::REDIRECTS_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}
