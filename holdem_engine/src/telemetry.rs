//! Engine metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! host installs a recorder.

use crate::game::entities::{Chips, TableId};

// ============================================================================
// Table Metrics
// ============================================================================

pub fn hand_started(table_id: TableId) {
    metrics::counter!("holdem_hands_started_total", "table" => table_id.to_string()).increment(1);
}

pub fn hand_completed(table_id: TableId, pot: Chips, rake: Chips) {
    metrics::counter!("holdem_hands_completed_total", "table" => table_id.to_string())
        .increment(1);
    metrics::histogram!("holdem_pot_size_chips").record(pot as f64);
    metrics::counter!("holdem_rake_chips_total").increment(rake);
}

/// Increment rejected action counter.
pub fn action_rejected(table_id: TableId) {
    metrics::counter!("holdem_actions_rejected_total", "table" => table_id.to_string())
        .increment(1);
}

pub fn table_halted(table_id: TableId) {
    metrics::counter!("holdem_tables_halted_total", "table" => table_id.to_string()).increment(1);
}

/// Set active tables gauge.
pub fn active_tables(count: usize) {
    metrics::gauge!("holdem_active_tables").set(count as f64);
}

// ============================================================================
// Wallet / Persistence Metrics
// ============================================================================

/// A cash-out that could not be written and is waiting for retry.
pub fn settlement_deferred(table_id: TableId) {
    metrics::counter!("holdem_settlements_deferred_total", "table" => table_id.to_string())
        .increment(1);
}

pub fn history_save_failed() {
    metrics::counter!("holdem_history_save_failures_total").increment(1);
}
