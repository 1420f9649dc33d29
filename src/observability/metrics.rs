//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define membership metrics (changes, reloads, group sizes, webhooks)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `upstream_membership_changes_total` (counter): by group, operation, result
//! - `upstream_reloads_total` (counter): by result
//! - `upstream_reload_duration_seconds` (histogram): reload command latency
//! - `upstream_group_members` (gauge): members written to the last artifact
//! - `upstream_webhook_requests_total` (counter): by response status
//!
//! # Design Decisions
//! - Recording through the `metrics` facade is a no-op until a recorder is installed
//! - Labels are bounded: group names come from configuration

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::registry::Operation;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_change(group: &str, operation: Operation, result: &'static str) {
    counter!(
        "upstream_membership_changes_total",
        "group" => group.to_string(),
        "operation" => operation.as_str(),
        "result" => result
    )
    .increment(1);
}

pub fn record_reload(success: bool, started: Instant) {
    let result = if success { "ok" } else { "failed" };
    counter!("upstream_reloads_total", "result" => result).increment(1);
    histogram!("upstream_reload_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_members(group: &str, members: usize) {
    gauge!("upstream_group_members", "group" => group.to_string()).set(members as f64);
}

pub fn record_webhook(status: u16) {
    counter!("upstream_webhook_requests_total", "status" => status.to_string()).increment(1);
}
