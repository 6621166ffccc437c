//! Prometheus metrics for monitoring node health.
//!
//! The engine records its table metrics through the `metrics` facade; this
//! module installs the exporter that serves them in Prometheus text format.
//!
//! # Metrics Categories
//!
//! - **Table Metrics**: Hands started and completed, rejected actions, halts
//! - **Wallet Metrics**: Deferred and unsettled cash-outs
//! - **Persistence Metrics**: Hand history save failures
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use holdem_node::metrics;
//! use std::net::SocketAddr;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//! # }
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Sets up a Prometheus scrape endpoint on the specified address.
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Arguments
///
/// - `addr`: Address to bind the metrics server to (e.g., `0.0.0.0:9090`)
///
/// # Returns
///
/// Result indicating success or error message
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))?;
    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    metrics::describe_counter!("holdem_hands_started_total", "Hands dealt");
    metrics::describe_counter!("holdem_hands_completed_total", "Hands settled");
    metrics::describe_histogram!("holdem_pot_size_chips", "Pot size of completed hands");
    metrics::describe_counter!("holdem_rake_chips_total", "Rake collected");
    metrics::describe_counter!("holdem_actions_rejected_total", "Illegal or out-of-turn actions");
    metrics::describe_counter!("holdem_tables_halted_total", "Tables stopped on invariant violations");
    metrics::describe_gauge!("holdem_active_tables", "Tables hosted by this node");
    metrics::describe_counter!(
        "holdem_settlements_deferred_total",
        "Cash-outs queued for retry"
    );
    metrics::describe_counter!(
        "holdem_history_save_failures_total",
        "Completed hands that could not be stored"
    );
    metrics::describe_counter!(
        "holdem_unsettled_chips_total",
        "Chips left unsettled when a table closed"
    );
}

// ============================================================================
// Wallet Metrics
// ============================================================================

/// Record chips a closing table could not return to a wallet.
pub fn unsettled_chips(chips: u64) {
    metrics::counter!("holdem_unsettled_chips_total").increment(chips);
}
