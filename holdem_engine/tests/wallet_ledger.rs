//! Wallet ledger behavior against the repository contract.

use async_trait::async_trait;
use chrono::Utc;
use holdem_engine::{
    db::{InMemoryWalletRepository, RepositoryError, RepositoryResult, WalletRepository},
    game::entities::{Chips, PlayerId, TableId},
    wallet::{PlayerWallet, ReservationStatus, WalletError, WalletLedger},
};
use proptest::prelude::*;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio::sync::Barrier;

/// Delegates to an in-memory store until told to fail writes.
#[derive(Default)]
struct FlakyWalletRepository {
    inner: InMemoryWalletRepository,
    fail_writes: AtomicBool,
}

#[async_trait]
impl WalletRepository for FlakyWalletRepository {
    async fn get_wallet(&self, player_id: PlayerId) -> RepositoryResult<Option<PlayerWallet>> {
        self.inner.get_wallet(player_id).await
    }

    async fn save_wallet(&self, wallet: &PlayerWallet) -> RepositoryResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("write refused".to_string()));
        }
        self.inner.save_wallet(wallet).await
    }
}

/// Holds the next `gated` loads at a barrier so two writers start from the
/// same revision, and counts the saves refused as stale.
struct RacingWalletRepository {
    inner: InMemoryWalletRepository,
    barrier: Barrier,
    gated: AtomicUsize,
    conflicts: AtomicUsize,
}

impl RacingWalletRepository {
    fn new() -> Self {
        Self {
            inner: InMemoryWalletRepository::new(),
            barrier: Barrier::new(2),
            gated: AtomicUsize::new(0),
            conflicts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl WalletRepository for RacingWalletRepository {
    async fn get_wallet(&self, player_id: PlayerId) -> RepositoryResult<Option<PlayerWallet>> {
        let wallet = self.inner.get_wallet(player_id).await?;
        let gated = self
            .gated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if gated {
            self.barrier.wait().await;
        }
        Ok(wallet)
    }

    async fn save_wallet(&self, wallet: &PlayerWallet) -> RepositoryResult<()> {
        let saved = self.inner.save_wallet(wallet).await;
        if matches!(saved, Err(RepositoryError::Conflict { .. })) {
            self.conflicts.fetch_add(1, Ordering::SeqCst);
        }
        saved
    }
}

#[tokio::test]
async fn test_reserve_then_settle_with_winnings() {
    let ledger = WalletLedger::new(Arc::new(InMemoryWalletRepository::new()));
    ledger.open_wallet(1, 1_000).await.unwrap();

    let reservation = ledger.reserve(1, 7, 100).await.unwrap();
    assert_eq!(reservation.amount, 100);
    assert_eq!(reservation.status, ReservationStatus::Active);

    let info = ledger.balance_info(1).await.unwrap();
    assert_eq!((info.total, info.available, info.reserved), (1_000, 900, 100));

    let delta = ledger.settle(1, 7, 150).await.unwrap();
    assert_eq!(delta, 50);
    let info = ledger.balance_info(1).await.unwrap();
    assert_eq!((info.total, info.available, info.reserved), (1_050, 1_050, 0));
    assert!(ledger.active_reservation(1, 7).await.unwrap().is_none());
}

#[tokio::test]
async fn test_settle_twice_is_rejected() {
    let ledger = WalletLedger::new(Arc::new(InMemoryWalletRepository::new()));
    ledger.open_wallet(1, 500).await.unwrap();
    ledger.reserve(1, 3, 200).await.unwrap();
    assert_eq!(ledger.settle(1, 3, 0).await.unwrap(), -200);

    let again = ledger.settle(1, 3, 0).await;
    assert!(matches!(
        again,
        Err(WalletError::NoActiveReservation { player_id: 1, table_id: 3 })
    ));
    assert_eq!(ledger.balance_info(1).await.unwrap().total, 300);
}

#[tokio::test]
async fn test_one_reservation_per_table() {
    let ledger = WalletLedger::new(Arc::new(InMemoryWalletRepository::new()));
    ledger.open_wallet(1, 500).await.unwrap();
    ledger.reserve(1, 3, 100).await.unwrap();

    let duplicate = ledger.reserve(1, 3, 100).await;
    assert!(matches!(duplicate, Err(WalletError::ReservationExists { .. })));

    // A second table is fine.
    ledger.reserve(1, 4, 100).await.unwrap();
    assert_eq!(ledger.balance_info(1).await.unwrap().reserved, 200);
}

#[tokio::test]
async fn test_failed_write_changes_nothing() {
    let repository = Arc::new(FlakyWalletRepository::default());
    let ledger = WalletLedger::new(repository.clone());
    ledger.open_wallet(1, 1_000).await.unwrap();
    ledger.reserve(1, 2, 400).await.unwrap();

    repository.fail_writes.store(true, Ordering::SeqCst);
    let reserve = ledger.reserve(1, 5, 100).await;
    assert!(matches!(reserve, Err(WalletError::Repository(_))));
    let settle = ledger.settle(1, 2, 900).await;
    assert!(matches!(settle, Err(WalletError::Repository(_))));

    let info = ledger.balance_info(1).await.unwrap();
    assert_eq!((info.total, info.reserved), (1_000, 400));
    assert!(ledger.active_reservation(1, 5).await.unwrap().is_none());

    repository.fail_writes.store(false, Ordering::SeqCst);
    assert_eq!(ledger.settle(1, 2, 900).await.unwrap(), 500);
    assert_eq!(ledger.balance_info(1).await.unwrap().total, 1_500);
}

#[tokio::test]
async fn test_concurrent_reservations_across_tables() {
    let ledger = Arc::new(WalletLedger::new(Arc::new(InMemoryWalletRepository::new())));
    ledger.open_wallet(1, 250).await.unwrap();

    let mut tasks = Vec::new();
    for table_id in 1..=5 {
        let ledger = ledger.clone();
        tasks.push(tokio::spawn(async move {
            ledger.reserve(1, table_id, 100).await
        }));
    }
    let mut granted = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            granted += 1;
        }
    }

    assert_eq!(granted, 2);
    let info = ledger.balance_info(1).await.unwrap();
    assert_eq!((info.available, info.reserved), (50, 200));
}

#[tokio::test]
async fn test_ledgers_sharing_a_store_do_not_lose_updates() {
    let repository = Arc::new(RacingWalletRepository::new());
    let dealer = WalletLedger::new(repository.clone());
    let cashier = WalletLedger::new(repository.clone());
    dealer.open_wallet(1, 200).await.unwrap();
    dealer.reserve(1, 1, 100).await.unwrap();

    // Both ledgers read the wallet before either writes it back.
    repository.gated.store(2, Ordering::SeqCst);
    let (settled, reserved) = tokio::join!(dealer.settle(1, 1, 300), cashier.reserve(1, 2, 50));
    assert_eq!(settled.unwrap(), 200);
    assert_eq!(reserved.unwrap().amount, 50);
    assert_eq!(repository.conflicts.load(Ordering::SeqCst), 1);

    let info = dealer.balance_info(1).await.unwrap();
    assert_eq!((info.total, info.available, info.reserved), (400, 350, 50));
    assert!(dealer.active_reservation(1, 1).await.unwrap().is_none());
    let wallet = repository.get_wallet(1).await.unwrap().unwrap();
    assert_eq!(wallet.reservations[&1].status, ReservationStatus::Settled);
    assert_eq!(wallet.reservations[&1].final_stack, Some(300));
    assert!(wallet.reservations[&2].is_active());
}

#[derive(Clone, Debug)]
enum WalletOp {
    Reserve(TableId, Chips),
    Settle(TableId, Chips),
    Deposit(Chips),
}

fn wallet_op() -> impl Strategy<Value = WalletOp> {
    prop_oneof![
        (1..4i64, 0..600u64).prop_map(|(t, a)| WalletOp::Reserve(t, a)),
        (1..4i64, 0..1_200u64).prop_map(|(t, s)| WalletOp::Settle(t, s)),
        (0..300u64).prop_map(WalletOp::Deposit),
    ]
}

proptest! {
    /// Available always equals total minus reserved, and failed operations
    /// leave the wallet untouched.
    #[test]
    fn test_wallet_invariants_hold(ops in prop::collection::vec(wallet_op(), 1..40)) {
        let mut wallet = PlayerWallet::new(1, 1_000, Utc::now());
        for op in ops {
            let before = wallet.clone();
            let result = match op {
                WalletOp::Reserve(table_id, amount) => {
                    wallet.reserve(table_id, amount, Utc::now()).map(|_| ())
                }
                WalletOp::Settle(table_id, final_stack) => {
                    wallet.settle(table_id, final_stack, Utc::now()).map(|_| ())
                }
                WalletOp::Deposit(amount) => wallet.deposit(amount, Utc::now()).map(|_| ()),
            };
            if result.is_err() {
                prop_assert_eq!(&wallet, &before);
            }

            let info = wallet.balance_info().unwrap();
            prop_assert_eq!(info.available, info.total - info.reserved);
            prop_assert!(wallet.check_invariants().is_ok());
            let active = wallet.reservations.values().filter(|r| r.is_active()).count();
            prop_assert!(active <= 3);
        }
    }
}
