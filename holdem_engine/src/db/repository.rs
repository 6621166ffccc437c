//! Repository trait definitions for testability and dependency injection.
//!
//! The wallet ledger and table actors depend only on these traits; the
//! PostgreSQL implementations below and the in-memory ones in
//! [`super::memory`] are picked when the node is assembled.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use std::{collections::HashMap, time::Duration};
use thiserror::Error;

use super::timeouts::{DEFAULT_TRANSACTION_TIMEOUT, with_default_timeout, with_timeout};
use crate::game::{
    CompletedHand,
    entities::{Chips, HandId, PlayerId},
};
use crate::wallet::{PlayerWallet, Reservation};

/// Persistence errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation timed out
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Stored data does not describe a valid record
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Backend refused the write
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    /// The record changed since it was loaded; nothing was written
    #[error("Wallet {player_id} was modified concurrently (loaded revision {version})")]
    Conflict { player_id: PlayerId, version: i64 },
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Trait for wallet repository operations
///
/// `save_wallet` must be atomic: either the whole wallet (balance and
/// reservations) is stored or nothing is. It is also a compare-and-swap on
/// [`PlayerWallet::version`]: a wallet saved by someone else since it was
/// loaded is refused with [`RepositoryError::Conflict`], and a successful
/// save bumps the stored revision.
#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Load a wallet with its latest reservation per table
    async fn get_wallet(&self, player_id: PlayerId) -> RepositoryResult<Option<PlayerWallet>>;

    /// Store a wallet
    async fn save_wallet(&self, wallet: &PlayerWallet) -> RepositoryResult<()>;
}

/// Trait for completed hand storage
#[async_trait]
pub trait HandHistoryRepository: Send + Sync {
    /// Store a finished hand. Saving the same hand twice is a no-op.
    async fn save_completed_hand(&self, hand: &CompletedHand) -> RepositoryResult<()>;

    /// Fetch a finished hand for audit
    async fn get_completed_hand(&self, hand_id: HandId) -> RepositoryResult<Option<CompletedHand>>;
}

fn to_db(amount: Chips) -> RepositoryResult<i64> {
    i64::try_from(amount)
        .map_err(|_| RepositoryError::Corrupt(format!("chip amount {amount} exceeds i64")))
}

fn from_db(amount: i64) -> RepositoryResult<Chips> {
    Chips::try_from(amount)
        .map_err(|_| RepositoryError::Corrupt(format!("negative chip amount {amount}")))
}

/// PostgreSQL implementation of `WalletRepository`
pub struct PgWalletRepository {
    pool: PgPool,
}

impl PgWalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn reservation_from_row(row: &PgRow) -> RepositoryResult<Reservation> {
        let status: String = row.try_get("status")?;
        Ok(Reservation {
            id: row.try_get("id")?,
            player_id: row.try_get("player_id")?,
            table_id: row.try_get("table_id")?,
            amount: from_db(row.try_get("amount")?)?,
            status: status.parse().map_err(RepositoryError::Corrupt)?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            settled_at: row.try_get::<Option<DateTime<Utc>>, _>("settled_at")?,
            final_stack: row
                .try_get::<Option<i64>, _>("final_stack")?
                .map(from_db)
                .transpose()?,
        })
    }

    async fn load(&self, player_id: PlayerId) -> RepositoryResult<Option<PlayerWallet>> {
        let Some(row) = sqlx::query(
            "SELECT player_id, balance, updated_at, version FROM wallets WHERE player_id = $1",
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let rows = sqlx::query(
            r#"
            SELECT DISTINCT ON (table_id)
                   id, player_id, table_id, amount, status, created_at, settled_at, final_stack
            FROM reservations
            WHERE player_id = $1
            ORDER BY table_id, created_at DESC
            "#,
        )
        .bind(player_id)
        .fetch_all(&self.pool)
        .await?;

        let mut reservations = HashMap::with_capacity(rows.len());
        for row in &rows {
            let reservation = Self::reservation_from_row(row)?;
            reservations.insert(reservation.table_id, reservation);
        }

        Ok(Some(PlayerWallet {
            player_id: row.try_get("player_id")?,
            account_balance: from_db(row.try_get("balance")?)?,
            reservations,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
            version: row.try_get("version")?,
        }))
    }

    async fn store(&self, wallet: &PlayerWallet) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        let written = if wallet.version == 0 {
            sqlx::query(
                r#"
                INSERT INTO wallets (player_id, balance, updated_at, version)
                VALUES ($1, $2, $3, 1)
                ON CONFLICT (player_id) DO NOTHING
                "#,
            )
            .bind(wallet.player_id)
            .bind(to_db(wallet.account_balance)?)
            .bind(wallet.updated_at)
            .execute(&mut *tx)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE wallets
                SET balance = $2, updated_at = $3, version = version + 1
                WHERE player_id = $1 AND version = $4
                "#,
            )
            .bind(wallet.player_id)
            .bind(to_db(wallet.account_balance)?)
            .bind(wallet.updated_at)
            .bind(wallet.version)
            .execute(&mut *tx)
            .await?
        };
        // Dropping the transaction rolls it back.
        if written.rows_affected() == 0 {
            return Err(RepositoryError::Conflict {
                player_id: wallet.player_id,
                version: wallet.version,
            });
        }

        for reservation in wallet.reservations.values() {
            sqlx::query(
                r#"
                INSERT INTO reservations
                    (id, player_id, table_id, amount, status, created_at, settled_at, final_stack)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (id)
                DO UPDATE SET status = EXCLUDED.status,
                              settled_at = EXCLUDED.settled_at,
                              final_stack = EXCLUDED.final_stack
                "#,
            )
            .bind(reservation.id)
            .bind(reservation.player_id)
            .bind(reservation.table_id)
            .bind(to_db(reservation.amount)?)
            .bind(reservation.status.to_string())
            .bind(reservation.created_at)
            .bind(reservation.settled_at)
            .bind(reservation.final_stack.map(to_db).transpose()?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl WalletRepository for PgWalletRepository {
    async fn get_wallet(&self, player_id: PlayerId) -> RepositoryResult<Option<PlayerWallet>> {
        with_default_timeout(self.load(player_id)).await
    }

    async fn save_wallet(&self, wallet: &PlayerWallet) -> RepositoryResult<()> {
        with_timeout(DEFAULT_TRANSACTION_TIMEOUT, self.store(wallet)).await
    }
}

/// PostgreSQL implementation of `HandHistoryRepository`
///
/// Hands are stored as JSON text keyed by hand id.
pub struct PgHandHistoryRepository {
    pool: PgPool,
}

impl PgHandHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HandHistoryRepository for PgHandHistoryRepository {
    async fn save_completed_hand(&self, hand: &CompletedHand) -> RepositoryResult<()> {
        let record = serde_json::to_string(hand)?;
        with_default_timeout(async {
            sqlx::query(
                r#"
                INSERT INTO completed_hands (hand_id, table_id, completed_at, record)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (hand_id) DO NOTHING
                "#,
            )
            .bind(hand.hand_id)
            .bind(hand.table_id)
            .bind(hand.completed_at)
            .bind(&record)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    async fn get_completed_hand(&self, hand_id: HandId) -> RepositoryResult<Option<CompletedHand>> {
        with_default_timeout(async {
            let row = sqlx::query("SELECT record FROM completed_hands WHERE hand_id = $1")
                .bind(hand_id)
                .fetch_optional(&self.pool)
                .await?;
            match row {
                Some(row) => {
                    let record: String = row.try_get("record")?;
                    Ok(Some(serde_json::from_str(&record)?))
                }
                None => Ok(None),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chip_conversion_bounds() {
        assert_eq!(to_db(1_000).unwrap(), 1_000);
        assert!(matches!(to_db(u64::MAX), Err(RepositoryError::Corrupt(_))));
        assert_eq!(from_db(0).unwrap(), 0);
        assert!(matches!(from_db(-5), Err(RepositoryError::Corrupt(_))));
    }
}
