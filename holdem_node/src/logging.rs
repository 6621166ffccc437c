//! Structured logging configuration.
//!
//! The engine logs through the `log` facade; the subscriber installed here
//! also receives those records.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Levels come from the `RUST_LOG` env var, defaulting to `info,sqlx=warn`.
///
/// # Example
///
/// ```no_run
/// use holdem_node::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Node starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a table lifecycle event with structured data
///
/// # Arguments
///
/// * `table_id` - Table ID
/// * `event` - What happened (created, closed, halted)
/// * `message` - Event message
pub fn log_table_event(table_id: i64, event: &str, message: &str) {
    tracing::info!(table_id = table_id, event = event, "TABLE: {}", message);
}

/// Log chips that could not be returned to a wallet
///
/// These need manual reconciliation.
pub fn log_unsettled(table_id: i64, player_id: i64, chips: u64) {
    tracing::error!(
        table_id = table_id,
        player_id = player_id,
        chips = chips,
        "RECONCILE: chips left unsettled"
    );
}
