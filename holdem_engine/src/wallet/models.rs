//! Wallet data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::errors::{WalletError, WalletResult};
use crate::game::entities::{Chips, PlayerId, TableId};

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Active,
    Settled,
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReservationStatus::Active => write!(f, "active"),
            ReservationStatus::Settled => write!(f, "settled"),
        }
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ReservationStatus::Active),
            "settled" => Ok(ReservationStatus::Settled),
            other => Err(format!("unknown reservation status '{other}'")),
        }
    }
}

/// Chips set aside from a wallet while the player sits at a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub player_id: PlayerId,
    pub table_id: TableId,
    pub amount: Chips,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
    pub final_stack: Option<Chips>,
}

impl Reservation {
    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }
}

/// Balance summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceInfo {
    pub total: Chips,
    pub available: Chips,
    pub reserved: Chips,
}

/// Player wallet model
///
/// `reservations` keeps the latest reservation per table; a settled one is
/// replaced when the player reserves at that table again.
///
/// `version` is the stored revision this copy was loaded from, 0 for a
/// wallet that has never been saved. A save only lands on that revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerWallet {
    pub player_id: PlayerId,
    pub account_balance: Chips,
    pub reservations: HashMap<TableId, Reservation>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

impl PlayerWallet {
    pub fn new(player_id: PlayerId, account_balance: Chips, now: DateTime<Utc>) -> Self {
        Self {
            player_id,
            account_balance,
            reservations: HashMap::new(),
            updated_at: now,
            version: 0,
        }
    }

    /// Sum of active reservations.
    pub fn reserved(&self) -> Chips {
        self.reservations
            .values()
            .filter(|r| r.is_active())
            .map(|r| r.amount)
            .sum()
    }

    /// Balance not tied up at any table.
    ///
    /// # Errors
    ///
    /// * `WalletError::InvariantViolation` - Reservations exceed the balance
    pub fn available(&self) -> WalletResult<Chips> {
        self.account_balance
            .checked_sub(self.reserved())
            .ok_or_else(|| {
                WalletError::InvariantViolation(format!(
                    "player {} has {} reserved against a balance of {}",
                    self.player_id,
                    self.reserved(),
                    self.account_balance
                ))
            })
    }

    pub fn balance_info(&self) -> WalletResult<BalanceInfo> {
        Ok(BalanceInfo {
            total: self.account_balance,
            available: self.available()?,
            reserved: self.reserved(),
        })
    }

    pub fn active_reservation(&self, table_id: TableId) -> Option<&Reservation> {
        self.reservations.get(&table_id).filter(|r| r.is_active())
    }

    /// Sets `amount` aside for `table_id`.
    ///
    /// # Errors
    ///
    /// * `WalletError::InvalidAmount` - Amount is zero
    /// * `WalletError::ReservationExists` - Already reserved at this table
    /// * `WalletError::InsufficientFunds` - Amount above the available balance
    pub fn reserve(
        &mut self,
        table_id: TableId,
        amount: Chips,
        now: DateTime<Utc>,
    ) -> WalletResult<Reservation> {
        if amount == 0 {
            return Err(WalletError::InvalidAmount(amount));
        }
        if self.active_reservation(table_id).is_some() {
            return Err(WalletError::ReservationExists {
                player_id: self.player_id,
                table_id,
            });
        }
        let available = self.available()?;
        if amount > available {
            return Err(WalletError::InsufficientFunds {
                available,
                required: amount,
            });
        }

        let reservation = Reservation {
            id: Uuid::new_v4(),
            player_id: self.player_id,
            table_id,
            amount,
            status: ReservationStatus::Active,
            created_at: now,
            settled_at: None,
            final_stack: None,
        };
        self.reservations.insert(table_id, reservation.clone());
        self.updated_at = now;
        self.check_invariants()?;
        Ok(reservation)
    }

    /// Closes the table's reservation and applies the result to the balance.
    /// Returns `final_stack - amount`.
    ///
    /// # Errors
    ///
    /// * `WalletError::NoActiveReservation` - Nothing reserved at this table
    pub fn settle(
        &mut self,
        table_id: TableId,
        final_stack: Chips,
        now: DateTime<Utc>,
    ) -> WalletResult<i64> {
        let player_id = self.player_id;
        let reservation = self
            .reservations
            .get_mut(&table_id)
            .filter(|r| r.is_active())
            .ok_or(WalletError::NoActiveReservation {
                player_id,
                table_id,
            })?;

        let released = self
            .account_balance
            .checked_sub(reservation.amount)
            .ok_or_else(|| {
                WalletError::InvariantViolation(format!(
                    "reservation {} exceeds the balance",
                    reservation.id
                ))
            })?;
        let delta = i64::try_from(final_stack)
            .ok()
            .zip(i64::try_from(reservation.amount).ok())
            .map(|(won, staked)| won - staked)
            .ok_or_else(|| WalletError::InvariantViolation("chip amount overflow".to_string()))?;

        self.account_balance = released + final_stack;
        reservation.status = ReservationStatus::Settled;
        reservation.settled_at = Some(now);
        reservation.final_stack = Some(final_stack);
        self.updated_at = now;
        self.check_invariants()?;
        Ok(delta)
    }

    /// Adds chips to the balance.
    pub fn deposit(&mut self, amount: Chips, now: DateTime<Utc>) -> WalletResult<Chips> {
        if amount == 0 {
            return Err(WalletError::InvalidAmount(amount));
        }
        self.account_balance = self
            .account_balance
            .checked_add(amount)
            .ok_or_else(|| WalletError::InvariantViolation("balance overflow".to_string()))?;
        self.updated_at = now;
        Ok(self.account_balance)
    }

    /// Available balance is never negative and at most one reservation per
    /// table is active.
    pub fn check_invariants(&self) -> WalletResult<()> {
        self.available()?;
        if let Some((table_id, r)) = self.reservations.iter().find(|(t, r)| r.table_id != **t) {
            return Err(WalletError::InvariantViolation(format!(
                "reservation {} for table {} filed under table {}",
                r.id, r.table_id, table_id
            )));
        }
        Ok(())
    }
}
