//! Hold'em hand engine.
//!
//! This module provides the per-hand core of the server:
//! - Deterministic, seed-driven decks with pluggable randomness
//! - No-limit betting rules as pure functions over [`HandState`]
//! - Hand ranking, side pots, rake and payouts
//! - The hand state machine and the audit record it produces

pub mod deck;
pub mod entities;
pub mod errors;
pub mod hand;
pub mod history;
pub mod pots;
pub mod ranking;
pub mod rules;
pub mod state_machine;

pub use deck::{
    ChaChaRandomness, Deck, DeckError, DeckService, Randomness, RandomnessProvider,
    ShuffleSeed, StackedRandomness, deck_commitment,
};
pub use errors::{HandError, HandResult, IllegalReason};
pub use hand::{HandConfig, HandPlayer, HandState, OddChipRule, RakePolicy};
pub use history::{CompletedHand, HandParticipant, ReplayError};
pub use pots::{Pot, PotAward, Settlement, build_side_pots, settle_hand};
pub use ranking::{HandCategory, HandRank, rank_hand};
pub use state_machine::{HandStateMachine, SeatedPlayer};
