//! # Hold'em Engine
//!
//! Server-side engine for multi-table, real-money no-limit Texas hold'em.
//!
//! Every hand is driven by a deterministic state machine over pure betting
//! rules, and every chip a player brings to a table is reserved from their
//! wallet on join and settled back on leave, so chips are conserved from
//! buy-in to cash-out.
//!
//! ## Core Modules
//!
//! - [`game`]: Seeded decks, betting rules, hand ranking, side pots, the hand
//!   state machine and replayable hand records
//! - [`wallet`]: Balances and per-table reservations
//! - [`table`]: Table sessions, table actors and the multi-table manager
//! - [`db`]: Repository contracts with PostgreSQL and in-memory implementations
//!
//! ## Example
//!
//! ```
//! use holdem_engine::game::{DeckService, HandConfig, HandStateMachine, SeatedPlayer};
//! use holdem_engine::game::entities::Action;
//! use uuid::Uuid;
//!
//! let deck = DeckService::default();
//! let seats = [
//!     SeatedPlayer { player_id: 1, seat: 0, stack: 1_000 },
//!     SeatedPlayer { player_id: 2, seat: 1, stack: 1_000 },
//! ];
//! let mut hand = HandStateMachine::start(
//!     Uuid::new_v4(),
//!     7,
//!     &seats,
//!     0,
//!     deck.generate_seed(),
//!     &deck,
//!     HandConfig::default(),
//! )
//! .unwrap();
//!
//! // Heads-up the button posts the small blind and acts first.
//! hand.act(1, Action::Fold).unwrap();
//! assert!(hand.is_complete());
//! ```

/// Repository contracts and their implementations.
pub mod db;

/// Crate-level error composition.
pub mod errors;
pub use errors::{EngineError, EngineResult, ErrorKind};

/// Core game logic, entities, and the hand state machine.
pub mod game;
pub use game::{CompletedHand, DeckService, HandStateMachine};

/// Tables: sessions, actors and the manager.
pub mod table;
pub use table::{TableConfig, TableManager};

/// Engine metrics.
pub mod telemetry;

/// Wallet balances and reservations.
pub mod wallet;
pub use wallet::WalletLedger;
