//! In-memory repositories for single-node runs and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::repository::{
    HandHistoryRepository, RepositoryError, RepositoryResult, WalletRepository,
};
use crate::game::{
    CompletedHand,
    entities::{HandId, PlayerId, TableId},
};
use crate::wallet::PlayerWallet;

#[derive(Default)]
pub struct InMemoryWalletRepository {
    wallets: RwLock<HashMap<PlayerId, PlayerWallet>>,
}

impl InMemoryWalletRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletRepository for InMemoryWalletRepository {
    async fn get_wallet(&self, player_id: PlayerId) -> RepositoryResult<Option<PlayerWallet>> {
        Ok(self.wallets.read().await.get(&player_id).cloned())
    }

    async fn save_wallet(&self, wallet: &PlayerWallet) -> RepositoryResult<()> {
        let mut wallets = self.wallets.write().await;
        let stored = wallets.get(&wallet.player_id).map_or(0, |w| w.version);
        if stored != wallet.version {
            return Err(RepositoryError::Conflict {
                player_id: wallet.player_id,
                version: wallet.version,
            });
        }
        let mut saved = wallet.clone();
        saved.version += 1;
        wallets.insert(wallet.player_id, saved);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryHandHistoryRepository {
    hands: RwLock<HashMap<HandId, CompletedHand>>,
}

impl InMemoryHandHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.hands.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.hands.read().await.is_empty()
    }

    /// Hands played at `table_id`, oldest first.
    pub async fn hands_for_table(&self, table_id: TableId) -> Vec<CompletedHand> {
        let mut hands: Vec<CompletedHand> = self
            .hands
            .read()
            .await
            .values()
            .filter(|h| h.table_id == table_id)
            .cloned()
            .collect();
        hands.sort_by_key(|h| h.completed_at);
        hands
    }
}

#[async_trait]
impl HandHistoryRepository for InMemoryHandHistoryRepository {
    async fn save_completed_hand(&self, hand: &CompletedHand) -> RepositoryResult<()> {
        self.hands
            .write()
            .await
            .entry(hand.hand_id)
            .or_insert_with(|| hand.clone());
        Ok(())
    }

    async fn get_completed_hand(&self, hand_id: HandId) -> RepositoryResult<Option<CompletedHand>> {
        Ok(self.hands.read().await.get(&hand_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_wallet_roundtrip() {
        let repo = InMemoryWalletRepository::new();
        assert!(repo.get_wallet(1).await.unwrap().is_none());

        let mut wallet = PlayerWallet::new(1, 300, Utc::now());
        wallet.reserve(9, 100, Utc::now()).unwrap();
        repo.save_wallet(&wallet).await.unwrap();

        let loaded = repo.get_wallet(1).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(PlayerWallet { version: 0, ..loaded }, wallet);
    }

    #[tokio::test]
    async fn test_stale_wallet_is_refused() {
        let repo = InMemoryWalletRepository::new();
        repo.save_wallet(&PlayerWallet::new(1, 300, Utc::now()))
            .await
            .unwrap();
        assert!(matches!(
            repo.save_wallet(&PlayerWallet::new(1, 999, Utc::now())).await,
            Err(RepositoryError::Conflict { player_id: 1, version: 0 })
        ));

        let mut first = repo.get_wallet(1).await.unwrap().unwrap();
        let mut second = first.clone();
        first.deposit(50, Utc::now()).unwrap();
        repo.save_wallet(&first).await.unwrap();

        second.reserve(4, 100, Utc::now()).unwrap();
        assert!(matches!(
            repo.save_wallet(&second).await,
            Err(RepositoryError::Conflict { player_id: 1, version: 1 })
        ));
        let stored = repo.get_wallet(1).await.unwrap().unwrap();
        assert_eq!((stored.account_balance, stored.reserved(), stored.version), (350, 0, 2));
    }
}
