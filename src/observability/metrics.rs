//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): handled requests by operation, status
//! - `relay_request_duration_seconds` (histogram): end-to-end handler latency
//! - `relay_upstream_requests_total` (counter): outbound calls by operation, status
//! - `relay_upstream_duration_seconds` (histogram): outbound call latency
//!
//! Recording is a no-op until a recorder is installed by [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::StatusCode;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a handled inbound request.
pub fn record_request(operation: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "relay_requests_total",
        "operation" => operation,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "operation" => operation)
        .record(start.elapsed().as_secs_f64());
}

/// Record one outbound call. `None` status means a transport failure.
pub fn record_upstream(operation: &'static str, status: Option<StatusCode>, start: Instant) {
    let status = status.map_or_else(|| "error".to_string(), |s| s.as_u16().to_string());
    metrics::counter!(
        "relay_upstream_requests_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!("relay_upstream_duration_seconds", "operation" => operation)
        .record(start.elapsed().as_secs_f64());
}
