//! Table module providing multi-table support with an async actor model.
//!
//! This module implements:
//! - TableSession: seats, stacks and the dealer button driving one hand at a time
//! - TableActor: async actor owning a single table's session
//! - TableManager: creates, routes to and closes table actors
//! - TableRegistry: the contract for deciding which node hosts a table
//!
//! ## Architecture
//!
//! Each table runs in a separate Tokio task with an mpsc message inbox.
//! Joining reserves the buy-in through the wallet ledger before seating;
//! leaving settles the reservation with the final stack.
//!
//! ## Example
//!
//! ```no_run
//! use holdem_engine::db::{HistoryRecorder, InMemoryHandHistoryRepository, InMemoryWalletRepository};
//! use holdem_engine::game::{DeckService, entities::Action};
//! use holdem_engine::table::{LocalRegistry, TableConfig, TableManager};
//! use holdem_engine::wallet::WalletLedger;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let wallet = Arc::new(WalletLedger::new(Arc::new(InMemoryWalletRepository::new())));
//!     let recorder = HistoryRecorder::new(Arc::new(InMemoryHandHistoryRepository::new()));
//!     let manager = TableManager::new(
//!         wallet.clone(),
//!         recorder,
//!         Arc::new(LocalRegistry::default()),
//!         DeckService::default(),
//!     );
//!
//!     let table = manager.create_table(TableConfig::default()).await?;
//!     wallet.open_wallet(1, 10_000).await?;
//!     wallet.open_wallet(2, 10_000).await?;
//!     manager.add_player(table, 1, 5_000).await?;
//!     manager.add_player(table, 2, 5_000).await?;
//!
//!     manager.start_round_if_ready(table).await?;
//!     let result = manager.process_player_action(table, 1, Action::Call).await?;
//!     println!("accepted: {}", result.success);
//!
//!     let stack = manager.remove_player(table, 1).await?;
//!     println!("left with {}", stack);
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;
pub mod registry;
pub mod session;
pub mod view;

pub use actor::{TableActor, TableHandle};
pub use config::TableConfig;
pub use errors::{TableError, TableResult};
pub use manager::TableManager;
pub use messages::{CloseReport, LeaveOutcome, TableMessage};
pub use registry::{LocalRegistry, NodeId, RegistryError, TableRegistry};
pub use session::{Departure, TableSession};
pub use view::{ActionResult, GameState, RevealedHand, SeatView, ShowdownReveal, TableSummary};
