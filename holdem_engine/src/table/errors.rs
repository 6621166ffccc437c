//! Table error types.

use thiserror::Error;

use crate::game::{
    deck::DeckError,
    entities::{Chips, PlayerId, SeatIndex, TableId},
    errors::HandError,
};

fn describe_seat(seat: &Option<SeatIndex>) -> String {
    match seat {
        Some(seat) => format!("seat {seat} is taken or does not exist"),
        None => "no open seat".to_string(),
    }
}

/// Table errors
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Seat unavailable: {}", describe_seat(.0))]
    SeatUnavailable(Option<SeatIndex>),

    #[error("Table {0} is full")]
    TableFull(TableId),

    #[error("Player {0} is not seated")]
    PlayerNotSeated(PlayerId),

    #[error("Player {0} is already seated")]
    PlayerAlreadySeated(PlayerId),

    #[error("Buy-in {amount} outside the table limits {min}..={max}")]
    InvalidBuyIn { amount: Chips, min: Chips, max: Chips },

    #[error("Table {0} not found")]
    TableNotFound(TableId),

    #[error("Invalid table configuration: {0}")]
    InvalidConfig(String),

    /// Table stopped after a chip accounting failure
    #[error("Table {0} is halted")]
    Halted(TableId),

    #[error(transparent)]
    Hand(#[from] HandError),

    #[error(transparent)]
    Deck(#[from] DeckError),
}

impl TableError {
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, TableError::Hand(e) if e.is_invariant_violation())
    }
}

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;
