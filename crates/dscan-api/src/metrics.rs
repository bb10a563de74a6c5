//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return its render handle.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

/// Metric names.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "dscan_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "dscan_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "dscan_http_requests_in_flight";

    pub const UPLOADS_TOTAL: &str = "dscan_uploads_total";
    pub const UPLOAD_DURATION_SECONDS: &str = "dscan_upload_duration_seconds";
    pub const STAGE_DURATION_SECONDS: &str = "dscan_stage_duration_seconds";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "dscan_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record the end of an upload. `outcome` is `success` or the failing stage.
pub fn record_upload(kind: &str, outcome: &str, duration_secs: f64) {
    let labels = [("kind", kind.to_string()), ("outcome", outcome.to_string())];
    counter!(names::UPLOADS_TOTAL, &labels).increment(1);
    histogram!(names::UPLOAD_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record how long one pipeline stage took.
pub fn record_stage(stage: &str, kind: &str, duration_secs: f64) {
    let labels = [("stage", stage.to_string()), ("kind", kind.to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    // Route templates keep label cardinality bounded
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
