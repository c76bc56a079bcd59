//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, rejections, latency)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `webhook_requests_total` (counter): requests by response status
//! - `admission_rejections_total` (counter): rejections by gate
//! - `webhook_request_duration_seconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - The recorder is process-global; installation failures are logged and
//!   tolerated so a second server in one process still works

use std::time::Instant;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder. Returns the render handle for the
/// /metrics endpoint, or `None` if a recorder is already installed.
pub fn install() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder not installed");
            None
        }
    }
}

/// Count one completed request and record its latency.
pub fn record_request(status: u16, start: Instant) {
    metrics::counter!("webhook_requests_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("webhook_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

/// Count one admission rejection by gate.
pub fn record_rejection(gate: &'static str) {
    metrics::counter!("admission_rejections_total", "gate" => gate).increment(1);
}
