//! # Prometheus Metrics
//!
//! Records request counts and latencies through the `metrics` facade.
//! Without an installed recorder every call is a no-op; the binary
//! installs `metrics-exporter-prometheus` and serves `/metrics`.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Counter: requests by method and status.
pub const HTTP_REQUESTS_TOTAL: &str = "simcache_http_requests_total";
/// Histogram: request latency in seconds.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "simcache_http_request_duration_seconds";
/// Counter: store attempts by outcome.
pub const STORE_TOTAL: &str = "simcache_store_total";

/// Middleware that records request count and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "status" => status)
        .increment(1);
    metrics::histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method)
        .record(started.elapsed().as_secs_f64());

    response
}

/// Count one store attempt.
///
/// `outcome` is one of `stored`, `duplicate`, `rejected`, `error`.
pub fn record_store(outcome: &'static str) {
    metrics::counter!(STORE_TOTAL, "outcome" => outcome).increment(1);
}
