//! Firestore request metrics.

use metrics::{counter, histogram};

/// Metric name constants.
pub mod names {
    /// Total Firestore requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "firestore_requests_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "firestore_latency_seconds";
}

/// Record metrics for a completed Firestore request.
pub fn record_request(operation: &'static str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation,
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(names::LATENCY_SECONDS, "operation" => operation).record(latency_ms / 1000.0);
}
