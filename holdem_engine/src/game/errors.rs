//! Hand error types.

use thiserror::Error;

use super::{
    deck::DeckError,
    entities::{Chips, PlayerId, Round},
};

/// Why a submitted action was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IllegalReason {
    #[error("it is not player {0}'s turn")]
    OutOfTurn(PlayerId),

    #[error("player {0} is not in this hand")]
    NotInHand(PlayerId),

    #[error("{0} is not one of the offered actions")]
    NotOffered(String),

    #[error("amount {amount} exceeds remaining stack {stack}")]
    AmountExceedsStack { amount: Chips, stack: Chips },

    #[error("amount {amount} is below the minimum of {minimum}")]
    BelowMinimum { amount: Chips, minimum: Chips },

    #[error("no betting is possible in the {0} round")]
    RoundClosed(Round),
}

/// Hand errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandError {
    /// Rejected action; the hand state is unchanged
    #[error("illegal action: {0}")]
    IllegalAction(IllegalReason),

    /// No hand is in progress
    #[error("no hand in progress")]
    NoActiveHand,

    /// Not enough players with chips to deal
    #[error("need at least 2 players with chips, have {0}")]
    NotEnoughPlayers(usize),

    /// Deck failure while dealing
    #[error("deck error: {0}")]
    Deck(#[from] DeckError),

    /// Chip accounting broke; the hand must not continue
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl HandError {
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

impl From<IllegalReason> for HandError {
    fn from(reason: IllegalReason) -> Self {
        Self::IllegalAction(reason)
    }
}

/// Result type for hand operations
pub type HandResult<T> = Result<T, HandError>;
