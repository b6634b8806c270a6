//! Metrics collection and exposition.
//!
//! # Metrics
//! - `warden_probes_total` (counter): probe attempts by `result` (success, failure)
//! - `warden_health_status` (gauge): 0=starting, 1=healthy, 2=unhealthy
//! - `warden_consecutive_failures` (gauge): current failure streak

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::HealthStatus;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_probe(success: bool) {
    let result = if success { "success" } else { "failure" };
    ::metrics::counter!("warden_probes_total", "result" => result).increment(1);
}

pub fn record_health(status: HealthStatus, consecutive_failures: u32) {
    ::metrics::gauge!("warden_health_status").set(status.as_gauge());
    ::metrics::gauge!("warden_consecutive_failures").set(f64::from(consecutive_failures));
}
