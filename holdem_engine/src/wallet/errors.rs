//! Wallet error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::game::entities::{Chips, PlayerId, TableId};

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    /// Persistence failed; nothing was committed
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Amount above the available balance
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: Chips, required: Chips },

    /// Wallet not found
    #[error("Wallet not found for player {0}")]
    WalletNotFound(PlayerId),

    /// Wallet already exists
    #[error("Wallet already exists for player {0}")]
    WalletExists(PlayerId),

    /// Player already has chips reserved at the table
    #[error("Player {player_id} already has an active reservation at table {table_id}")]
    ReservationExists {
        player_id: PlayerId,
        table_id: TableId,
    },

    /// Nothing to settle
    #[error("Player {player_id} has no active reservation at table {table_id}")]
    NoActiveReservation {
        player_id: PlayerId,
        table_id: TableId,
    },

    /// Invalid amount (must be positive)
    #[error("Invalid amount: {0}")]
    InvalidAmount(Chips),

    /// Balance arithmetic broke; the wallet is left untouched
    #[error("Wallet invariant violated: {0}")]
    InvariantViolation(String),
}

impl WalletError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Repository errors are sanitized to prevent information disclosure about
    /// the storage layer, and player/table IDs are redacted.
    pub fn client_message(&self) -> String {
        match self {
            WalletError::Repository(_) => "Internal server error".to_string(),
            WalletError::InvariantViolation(_) => "Internal server error".to_string(),
            WalletError::WalletNotFound(_) => "Wallet not found".to_string(),
            WalletError::WalletExists(_) => "Wallet already exists".to_string(),
            WalletError::ReservationExists { .. } => {
                "Chips are already reserved at this table".to_string()
            }
            WalletError::NoActiveReservation { .. } => {
                "No chips are reserved at this table".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;
