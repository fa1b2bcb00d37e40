//! Metrics collection and exposition.
//!
//! # Metrics
//! - `client_requests_total` (counter): requests by method and outcome
//! - `client_retries_total` (counter): retry attempts scheduled
//! - `client_health_checks_total` (counter): probes by result
//! - `client_token_refresh_total` (counter): refreshes by result
//! - `client_server_online` (gauge): 1=online, 0=offline/unknown
//! - `client_consecutive_failures` (gauge)
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, outcome: &'static str) {
    metrics::counter!(
        "client_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_retry() {
    metrics::counter!("client_retries_total").increment(1);
}

pub fn record_health_check(healthy: bool) {
    let result = if healthy { "healthy" } else { "unhealthy" };
    metrics::counter!("client_health_checks_total", "result" => result).increment(1);
}

pub fn record_token_refresh(success: bool) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!("client_token_refresh_total", "result" => result).increment(1);
}

pub fn record_server_status(online: bool, consecutive_failures: u32) {
    metrics::gauge!("client_server_online").set(if online { 1.0 } else { 0.0 });
    metrics::gauge!("client_consecutive_failures").set(consecutive_failures as f64);
}
