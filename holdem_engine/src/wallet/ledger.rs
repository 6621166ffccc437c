//! Wallet ledger implementation.

use chrono::Utc;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

use super::{
    errors::{WalletError, WalletResult},
    models::{BalanceInfo, PlayerWallet, Reservation},
};
use crate::db::{RepositoryError, WalletRepository};
use crate::game::entities::{Chips, PlayerId, TableId};

/// Reloads allowed when another writer saved the wallet first
const CONFLICT_RETRIES: usize = 5;

/// Reservation and settlement of table chips against durable balances.
///
/// Every operation loads the wallet, applies the change to a copy and saves
/// it. Nothing is visible until the save succeeds, so a failed save leaves
/// the stored wallet exactly as it was. Operations on the same player run
/// one at a time within a ledger; ledgers sharing a repository are kept
/// apart by the repository's revision check, and the losing operation is
/// replayed against the fresh wallet.
pub struct WalletLedger {
    repository: Arc<dyn WalletRepository>,
    locks: Mutex<HashMap<PlayerId, Arc<Mutex<()>>>>,
}

impl WalletLedger {
    /// Create a new ledger over a wallet repository
    pub fn new(repository: Arc<dyn WalletRepository>) -> Self {
        Self {
            repository,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn player_lock(&self, player_id: PlayerId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(player_id).or_default().clone()
    }

    /// Forget a player's lock once nobody else holds or waits on it.
    async fn release_lock(&self, player_id: PlayerId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks
            .get(&player_id)
            .is_some_and(|held| Arc::strong_count(held) == 1)
        {
            locks.remove(&player_id);
        }
    }

    async fn load(&self, player_id: PlayerId) -> WalletResult<PlayerWallet> {
        self.repository
            .get_wallet(player_id)
            .await?
            .ok_or(WalletError::WalletNotFound(player_id))
    }

    /// Load, change and store one wallet under the player's lock.
    async fn update<T>(
        &self,
        player_id: PlayerId,
        change: impl Fn(&mut PlayerWallet) -> WalletResult<T>,
    ) -> WalletResult<T> {
        let lock = self.player_lock(player_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.apply(player_id, &change).await
        };
        self.release_lock(player_id, lock).await;
        result
    }

    async fn apply<T>(
        &self,
        player_id: PlayerId,
        change: &impl Fn(&mut PlayerWallet) -> WalletResult<T>,
    ) -> WalletResult<T> {
        let mut conflicts = 0;
        loop {
            let mut wallet = self.load(player_id).await?;
            let result = change(&mut wallet)?;
            wallet.check_invariants()?;
            match self.repository.save_wallet(&wallet).await {
                Ok(()) => return Ok(result),
                Err(RepositoryError::Conflict { version, .. }) if conflicts < CONFLICT_RETRIES => {
                    conflicts += 1;
                    log::warn!(
                        "Wallet {} moved past revision {} during an update, retrying ({}/{})",
                        player_id,
                        version,
                        conflicts,
                        CONFLICT_RETRIES
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Create a funded wallet
    ///
    /// # Errors
    ///
    /// * `WalletError::WalletExists` - The player already has a wallet
    pub async fn open_wallet(
        &self,
        player_id: PlayerId,
        initial_balance: Chips,
    ) -> WalletResult<BalanceInfo> {
        let lock = self.player_lock(player_id).await;
        let opened = {
            let _guard = lock.lock().await;
            self.create(player_id, initial_balance).await
        };
        self.release_lock(player_id, lock).await;
        let wallet = opened?;
        log::info!("Opened wallet for player {} with {}", player_id, initial_balance);
        wallet.balance_info()
    }

    async fn create(
        &self,
        player_id: PlayerId,
        initial_balance: Chips,
    ) -> WalletResult<PlayerWallet> {
        if self.repository.get_wallet(player_id).await?.is_some() {
            return Err(WalletError::WalletExists(player_id));
        }
        let wallet = PlayerWallet::new(player_id, initial_balance, Utc::now());
        match self.repository.save_wallet(&wallet).await {
            Ok(()) => Ok(wallet),
            Err(RepositoryError::Conflict { .. }) => Err(WalletError::WalletExists(player_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Add chips to a wallet
    ///
    /// # Returns
    ///
    /// * `WalletResult<BalanceInfo>` - Balance after the deposit
    pub async fn deposit(&self, player_id: PlayerId, amount: Chips) -> WalletResult<BalanceInfo> {
        self.update(player_id, |wallet| {
            wallet.deposit(amount, Utc::now())?;
            wallet.balance_info()
        })
        .await
    }

    /// Set chips aside for a table (buy-in)
    ///
    /// # Arguments
    ///
    /// * `player_id` - Player ID
    /// * `table_id` - Table ID
    /// * `amount` - Chips to reserve
    ///
    /// # Returns
    ///
    /// * `WalletResult<Reservation>` - The new active reservation
    ///
    /// # Errors
    ///
    /// * `WalletError::InvalidAmount` - Amount is zero
    /// * `WalletError::InsufficientFunds` - Amount above the available balance
    /// * `WalletError::ReservationExists` - Already reserved at this table
    pub async fn reserve(
        &self,
        player_id: PlayerId,
        table_id: TableId,
        amount: Chips,
    ) -> WalletResult<Reservation> {
        let reservation = self
            .update(player_id, |wallet| wallet.reserve(table_id, amount, Utc::now()))
            .await?;
        log::info!(
            "Reserved {} for player {} at table {} ({})",
            amount,
            player_id,
            table_id,
            reservation.id
        );
        Ok(reservation)
    }

    /// Close a reservation with the player's final table stack (cash-out)
    ///
    /// # Returns
    ///
    /// * `WalletResult<i64>` - Net result at the table, `final_stack - reserved`
    ///
    /// # Errors
    ///
    /// * `WalletError::NoActiveReservation` - Nothing reserved, or already settled
    pub async fn settle(
        &self,
        player_id: PlayerId,
        table_id: TableId,
        final_stack: Chips,
    ) -> WalletResult<i64> {
        let delta = self
            .update(player_id, |wallet| {
                wallet.settle(table_id, final_stack, Utc::now())
            })
            .await?;
        log::info!(
            "Settled player {} at table {} with {} (net {})",
            player_id,
            table_id,
            final_stack,
            delta
        );
        Ok(delta)
    }

    /// Get balance summary
    pub async fn balance_info(&self, player_id: PlayerId) -> WalletResult<BalanceInfo> {
        self.load(player_id).await?.balance_info()
    }

    /// Get the active reservation at a table, if any
    pub async fn active_reservation(
        &self,
        player_id: PlayerId,
        table_id: TableId,
    ) -> WalletResult<Option<Reservation>> {
        Ok(self
            .load(player_id)
            .await?
            .active_reservation(table_id)
            .cloned())
    }
}
