//! Crate-level error composition.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::game::{
    deck::DeckError,
    entities::TableId,
    errors::{HandError, IllegalReason},
};
use crate::table::{RegistryError, TableError};
use crate::wallet::WalletError;

/// Broad classes of failure callers react to differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected request; nothing changed
    Validation,
    /// Wallet refused the operation; nothing changed
    Financial,
    /// Storage failed
    Persistence,
    /// Chip accounting broke; the affected table stops
    InvariantViolation,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Table {0} is closed")]
    TableClosed(TableId),
}

impl From<HandError> for EngineError {
    fn from(error: HandError) -> Self {
        EngineError::Table(TableError::Hand(error))
    }
}

impl From<IllegalReason> for EngineError {
    fn from(reason: IllegalReason) -> Self {
        EngineError::from(HandError::from(reason))
    }
}

impl From<DeckError> for EngineError {
    fn from(error: DeckError) -> Self {
        EngineError::Table(TableError::Deck(error))
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Table(TableError::Hand(HandError::InvariantViolation(_))) => {
                ErrorKind::InvariantViolation
            }
            EngineError::Table(TableError::Halted(_)) => ErrorKind::InvariantViolation,
            EngineError::Table(_) | EngineError::TableClosed(_) => ErrorKind::Validation,
            EngineError::Wallet(WalletError::InvariantViolation(_)) => {
                ErrorKind::InvariantViolation
            }
            EngineError::Wallet(WalletError::Repository(_)) => ErrorKind::Persistence,
            EngineError::Wallet(_) => ErrorKind::Financial,
            EngineError::Repository(_) => ErrorKind::Persistence,
            EngineError::Registry(RegistryError::Unavailable(_)) => ErrorKind::Persistence,
            EngineError::Registry(_) => ErrorKind::Validation,
        }
    }

    pub fn is_invariant_violation(&self) -> bool {
        self.kind() == ErrorKind::InvariantViolation
    }

    /// Get a client-safe error message that doesn't leak internal details
    pub fn client_message(&self) -> String {
        match self {
            EngineError::Wallet(e) => e.client_message(),
            EngineError::Table(TableError::Halted(_)) => self.to_string(),
            EngineError::Repository(_) => "Internal server error".to_string(),
            EngineError::Registry(RegistryError::Unavailable(_)) => {
                "Internal server error".to_string()
            }
            _ if self.is_invariant_violation() => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
