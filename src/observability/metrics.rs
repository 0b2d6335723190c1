//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, operation, status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_authorizations_total` (counter): authorizer decisions by operation
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, operation: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("operation", operation.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("gateway_requests_total", &labels).increment(1);
    metrics::histogram!("gateway_request_duration_seconds", &labels[..2])
        .record(start.elapsed().as_secs_f64());
}

/// Record an authorizer decision.
pub fn record_authorization(operation: &str, decision: &'static str) {
    metrics::counter!(
        "gateway_authorizations_total",
        "operation" => operation.to_string(),
        "decision" => decision
    )
    .increment(1);
}
