//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "sitesense_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "sitesense_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "sitesense_http_requests_in_flight";

    // Processing metrics
    pub const VIDEOS_PROCESSED_TOTAL: &str = "sitesense_videos_processed_total";
    pub const PROCESSING_DURATION_SECONDS: &str = "sitesense_processing_duration_seconds";
    pub const UPLOAD_DURATION_SECONDS: &str = "sitesense_upload_duration_seconds";
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

/// Record a processed video.
pub fn record_video_processed(strategy: &str, duration_secs: f64) {
    let labels = [("strategy", strategy.to_string())];
    counter!(names::VIDEOS_PROCESSED_TOTAL, &labels).increment(1);
    histogram!(names::PROCESSING_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a storage upload duration.
pub fn record_upload_duration(duration_secs: f64) {
    histogram!(names::UPLOAD_DURATION_SECONDS).record(duration_secs);
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
