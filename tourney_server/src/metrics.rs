//! Prometheus metrics for monitoring the bracket server.
//!
//! Metrics are exposed in Prometheus text format by a separate listener when
//! `METRICS_BIND` is set. Without an installed exporter every recorder call
//! here is a no-op.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use tourney_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/tournaments", 200);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Bracket Metrics
// ============================================================================

/// Increment brackets built counter and record the bracket size.
pub fn brackets_built_total(matches_created: usize) {
    metrics::counter!("brackets_built_total").increment(1);
    metrics::histogram!("bracket_matches_created").record(matches_created as f64);
}

/// Increment recorded results counter.
pub fn results_recorded_total(decisive: bool) {
    metrics::counter!("results_recorded_total",
        "decisive" => decisive.to_string()
    )
    .increment(1);
}

/// Increment winners advanced counter.
pub fn winners_advanced_total() {
    metrics::counter!("winners_advanced_total").increment(1);
}
