//! Wallet module: durable balances and per-table chip reservations.
//!
//! This module implements:
//! - One active reservation per player and table, created on buy-in
//! - Settlement on leave, applying `final_stack - reserved` to the balance
//! - All-or-nothing updates through a [`crate::db::WalletRepository`]
//! - Per-player serialization of wallet operations
//!
//! ## Example
//!
//! ```no_run
//! use holdem_engine::db::InMemoryWalletRepository;
//! use holdem_engine::wallet::WalletLedger;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ledger = WalletLedger::new(Arc::new(InMemoryWalletRepository::new()));
//!     ledger.open_wallet(1, 1_000).await?;
//!
//!     // Buy in for 100, leave with 150
//!     ledger.reserve(1, 7, 100).await?;
//!     let delta = ledger.settle(1, 7, 150).await?;
//!     println!("Net result: {}", delta);
//!
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod ledger;
pub mod models;

pub use errors::{WalletError, WalletResult};
pub use ledger::WalletLedger;
pub use models::{BalanceInfo, PlayerWallet, Reservation, ReservationStatus};
