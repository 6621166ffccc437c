//! Table configuration models.

use serde::{Deserialize, Serialize};

use crate::game::{
    entities::{Blinds, Chips},
    hand::{HandConfig, OddChipRule, RakePolicy},
};

/// Hard ceiling on seats per table
pub const MAX_SEATS: usize = 10;

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Table name
    pub name: String,

    /// Maximum number of players (default: 9)
    pub max_players: usize,

    /// Small blind amount
    pub small_blind: Chips,

    /// Big blind amount
    pub big_blind: Chips,

    /// Minimum buy-in in big blinds (e.g., 20 BB)
    pub min_buy_in_bb: u16,

    /// Maximum buy-in in big blinds (e.g., 100 BB)
    pub max_buy_in_bb: u16,

    /// Absolute chip cap on a single buy-in
    pub absolute_chip_cap: Chips,

    /// Whether blinds are posted at the start of each hand
    pub post_blinds: bool,

    /// Rake in basis points of each pot (500 = 5%)
    pub rake_basis_points: u32,

    /// Most rake taken from one hand
    pub rake_cap: Option<Chips>,

    /// Skip the rake when the hand ends before the flop
    pub no_flop_no_drop: bool,

    /// Who receives an indivisible chip on a split pot
    pub odd_chip_rule: OddChipRule,

    /// Start hands automatically on the table tick
    pub auto_start: bool,

    /// Tick interval in milliseconds
    pub tick_interval_ms: u64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "Default Table".to_string(),
            max_players: 9,
            small_blind: 50,
            big_blind: 100,
            min_buy_in_bb: 20,
            max_buy_in_bb: 100,
            absolute_chip_cap: 100_000,
            post_blinds: true,
            rake_basis_points: 0,
            rake_cap: None,
            no_flop_no_drop: true,
            odd_chip_rule: OddChipRule::default(),
            auto_start: false,
            tick_interval_ms: 1_000,
        }
    }
}

impl TableConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.small_blind == 0 {
            return Err("Small blind must be positive".to_string());
        }

        if self.big_blind < self.small_blind {
            return Err("Big blind must be at least the small blind".to_string());
        }

        if self.max_buy_in_bb < self.min_buy_in_bb || self.min_buy_in_bb == 0 {
            return Err("Max buy-in must be at least min buy-in, which must be positive".to_string());
        }

        if self.max_players < 2 || self.max_players > MAX_SEATS {
            return Err(format!("Max players must be between 2 and {MAX_SEATS}"));
        }

        if self.absolute_chip_cap < self.min_buy_in_chips() {
            return Err("Absolute chip cap must allow the minimum buy-in".to_string());
        }

        if self.rake_basis_points > 10_000 {
            return Err("Rake cannot exceed 100%".to_string());
        }

        if self.tick_interval_ms == 0 {
            return Err("Tick interval must be positive".to_string());
        }

        Ok(())
    }

    /// Get minimum buy-in in chips
    pub fn min_buy_in_chips(&self) -> Chips {
        self.big_blind.saturating_mul(Chips::from(self.min_buy_in_bb))
    }

    /// Get maximum buy-in in chips
    pub fn max_buy_in_chips(&self) -> Chips {
        let bb_max = self.big_blind.saturating_mul(Chips::from(self.max_buy_in_bb));
        bb_max.min(self.absolute_chip_cap)
    }

    pub fn accepts_buy_in(&self, amount: Chips) -> bool {
        (self.min_buy_in_chips()..=self.max_buy_in_chips()).contains(&amount)
    }

    pub fn blinds(&self) -> Blinds {
        Blinds {
            small: self.small_blind,
            big: self.big_blind,
        }
    }

    /// Per-hand settings handed to each new hand
    pub fn hand_config(&self) -> HandConfig {
        HandConfig {
            blinds: self.blinds(),
            post_blinds: self.post_blinds,
            rake: RakePolicy {
                basis_points: self.rake_basis_points,
                cap: self.rake_cap,
                no_flop_no_drop: self.no_flop_no_drop,
            },
            odd_chip: self.odd_chip_rule,
        }
    }
}
