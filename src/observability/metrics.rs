//! Metrics collection and exposition.
//!
//! # Metrics
//! - `feeding_http_requests_total` (counter): requests by method, status
//! - `feeding_http_request_duration_seconds` (histogram): latency distribution
//! - `feeding_task_executions_total` (counter): executions by task, tier
//! - `feeding_task_duration_seconds` (histogram): execution latency by tier
//! - `feeding_tier_failures_total` (counter): recovered tier failures by tier
//! - `feeding_telemetry_delivery_failures_total` (counter)
//!
//! Recording is a no-op until a recorder is installed.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "feeding_http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("feeding_http_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_task_execution(task: &str, tier: &'static str, start: Instant) {
    counter!(
        "feeding_task_executions_total",
        "task" => task.to_string(),
        "tier" => tier
    )
    .increment(1);
    histogram!("feeding_task_duration_seconds", "tier" => tier)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_tier_failure(tier: &'static str) {
    counter!("feeding_tier_failures_total", "tier" => tier).increment(1);
}

pub fn record_delivery_failure() {
    counter!("feeding_telemetry_delivery_failures_total").increment(1);
}
