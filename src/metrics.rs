//! Prometheus metrics for sitegate.
//!
//! Installs a global Prometheus recorder using `metrics-exporter-prometheus`,
//! defines metric name constants, provides a Tower-compatible middleware
//! for HTTP RED metrics, and exposes the `/metrics` endpoint handler.

use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

// -- Metric name constants ----------------------------------------------------

/// Total HTTP requests (counter). Labels: method, status.
pub const HTTP_REQUESTS_TOTAL: &str = "sitegate_http_requests_total";

/// HTTP request duration in seconds (histogram). Labels: method.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "sitegate_http_request_duration_seconds";

/// Host-config cache hits (counter).
pub const HOST_CACHE_HITS_TOTAL: &str = "sitegate_host_cache_hits_total";

/// Host-config cache misses (counter).
pub const HOST_CACHE_MISSES_TOTAL: &str = "sitegate_host_cache_misses_total";

/// Origin fetches (counter). Labels: status.
pub const ORIGIN_FETCHES_TOTAL: &str = "sitegate_origin_fetches_total";

// -- Global recorder installation ---------------------------------------------

/// Singleton handle to the Prometheus recorder.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus metrics recorder. Idempotent -- safe to
/// call multiple times (e.g. in tests). Returns a reference to the global
/// handle.
pub fn init_metrics() -> &'static PrometheusHandle {
    PROMETHEUS_HANDLE.get_or_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install Prometheus recorder")
    })
}

/// Register metric descriptions with the global recorder. Call once after
/// `init_metrics()`.
pub fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(HOST_CACHE_HITS_TOTAL, "Host-config cache hits");
    describe_counter!(HOST_CACHE_MISSES_TOTAL, "Host-config cache misses");
    describe_counter!(ORIGIN_FETCHES_TOTAL, "Origin fetches by response status");
}

// -- Recording helpers --------------------------------------------------------

/// Record a host-config cache hit.
pub fn record_cache_hit() {
    counter!(HOST_CACHE_HITS_TOTAL).increment(1);
}

/// Record a host-config cache miss.
pub fn record_cache_miss() {
    counter!(HOST_CACHE_MISSES_TOTAL).increment(1);
}

/// Record one origin fetch and its response status.
pub fn record_origin_fetch(status: u16) {
    counter!(ORIGIN_FETCHES_TOTAL, "status" => status.to_string()).increment(1);
}

// -- Middleware ---------------------------------------------------------------

/// Tower middleware recording request count and duration for every
/// inbound request.
pub async fn metrics_middleware(
    req: Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Response {
    let method = req.method().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method)
        .record(start.elapsed().as_secs_f64());

    response
}

// -- Endpoint -----------------------------------------------------------------

/// `GET /metrics` -- render the Prometheus exposition format.
pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
