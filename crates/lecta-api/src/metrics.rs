//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "lecta_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "lecta_http_request_duration_seconds";

    pub const JOBS_ENQUEUED_TOTAL: &str = "lecta_jobs_enqueued_total";
    pub const JOBS_CANCELLED_TOTAL: &str = "lecta_jobs_cancelled_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a job submission.
pub fn record_job_enqueued() {
    counter!(names::JOBS_ENQUEUED_TOTAL).increment(1);
}

/// Record a job cancellation.
pub fn record_job_cancelled() {
    counter!(names::JOBS_CANCELLED_TOTAL).increment(1);
}

/// Middleware that times every request.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

/// Collapse id path segments so metrics stay low-cardinality.
fn sanitize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let looks_like_uuid = segment.len() == 36 && segment.matches('-').count() == 4;
            if looks_like_uuid {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
