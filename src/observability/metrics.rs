//! Metrics collection and exposition.
//!
//! # Metrics
//! - `consulize_requests_total` (counter): forwarded requests by dispatcher kind
//! - `consulize_health_intercepted_total` (counter): probes answered locally
//! - `consulize_upstream_errors_total` (counter): failed backend exchanges by kind
//! - `consulize_in_flight_requests` (gauge): requests currently being served
//! - `consulize_lifecycle_state` (gauge): numeric lifecycle state
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Exporter is optional and only started when an address is configured

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_forwarded(kind: &'static str) {
    counter!("consulize_requests_total", "kind" => kind).increment(1);
}

pub fn record_health_intercepted() {
    counter!("consulize_health_intercepted_total").increment(1);
}

pub fn record_upstream_error(kind: &'static str) {
    counter!("consulize_upstream_errors_total", "kind" => kind).increment(1);
}

pub fn record_in_flight(count: u64) {
    gauge!("consulize_in_flight_requests").set(count as f64);
}

pub fn record_lifecycle_state(ordinal: u8) {
    gauge!("consulize_lifecycle_state").set(f64::from(ordinal));
}
