//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder.
///
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "fruitscan_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "fruitscan_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "fruitscan_http_requests_in_flight";
    pub const HTTP_ERRORS_TOTAL: &str = "fruitscan_http_errors_total";

    // Detection metrics
    pub const INFERENCE_DURATION_SECONDS: &str = "fruitscan_inference_duration_seconds";
    pub const INFERENCE_FAILURES_TOTAL: &str = "fruitscan_inference_failures_total";
    pub const FRUITS_DETECTED_TOTAL: &str = "fruitscan_fruits_detected_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "fruitscan_rate_limit_hits_total";
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

/// Record a server-side request failure.
pub fn record_request_error(kind: &'static str) {
    counter!(names::HTTP_ERRORS_TOTAL, "kind" => kind).increment(1);
}

/// Record model inference duration.
pub fn record_inference_duration(backend: &'static str, duration_secs: f64) {
    histogram!(names::INFERENCE_DURATION_SECONDS, "backend" => backend).record(duration_secs);
}

/// Record a failed, timed out or aborted model call.
pub fn record_inference_failure(reason: &'static str) {
    counter!(names::INFERENCE_FAILURES_TOTAL, "reason" => reason).increment(1);
}

/// Record each fruit name returned by a detect call.
pub fn record_fruits_detected<'a>(names: impl Iterator<Item = &'a str>) {
    for name in names {
        counter!(names::FRUITS_DETECTED_TOTAL, "fruit" => name.to_string()).increment(1);
    }
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Collapse unknown paths so scanners cannot blow up label cardinality.
fn normalize_path(path: &str) -> &str {
    match path {
        "/detect" | "/detect/details" | "/fruit-names" | "/health" | "/healthz" | "/ready"
        | "/metrics" => path,
        _ => "other",
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path()).to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/detect"), "/detect");
        assert_eq!(normalize_path("/fruit-names"), "/fruit-names");
        assert_eq!(normalize_path("/wp-admin/setup.php"), "other");
    }
}
