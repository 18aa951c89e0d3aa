//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mockr_requests_total` (counter): requests by method, status
//! - `mockr_request_duration_seconds` (histogram): latency distribution
//! - `mockr_rate_limited_total` (counter): requests rejected with 429
//! - `mockr_config_reloads_total` (counter): reload attempts by outcome
//! - `mockr_routes` (gauge): routes in the active table

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Serve Prometheus metrics on `addr`. Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "mockr_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("mockr_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("mockr_rate_limited_total").increment(1);
}

pub fn record_reload(outcome: &'static str) {
    metrics::counter!("mockr_config_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_route_count(routes: usize) {
    metrics::gauge!("mockr_routes").set(routes as f64);
}
