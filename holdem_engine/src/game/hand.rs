//! Per-hand state shared by the rules engine and the state machine.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{
    deck::ShuffleSeed,
    entities::{BettingRecord, Blinds, Card, Chips, HandId, PlayerId, Round, SeatIndex, TableId},
    errors::{HandError, HandResult},
};

/// Who receives chips that cannot be split evenly between tied winners.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OddChipRule {
    /// The tied winner closest clockwise from the dealer button.
    #[default]
    ClockwiseFromButton,
    /// The tied winner in the lowest seat.
    LowestSeat,
}

/// House commission taken from each pot.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RakePolicy {
    /// Commission in hundredths of a percent (500 = 5%).
    pub basis_points: u32,
    /// Upper bound on the rake taken from a single hand.
    pub cap: Option<Chips>,
    /// Skip the rake on hands that end before the flop.
    pub no_flop_no_drop: bool,
}

impl RakePolicy {
    pub fn none() -> Self {
        Self::default()
    }

    /// Rake owed on a pot of `amount` given what the hand has already paid.
    /// Rounds down.
    pub fn rake_for(&self, amount: Chips, already_taken: Chips) -> Chips {
        let rake = (u128::from(amount) * u128::from(self.basis_points) / 10_000) as Chips;
        match self.cap {
            Some(cap) => rake.min(cap.saturating_sub(already_taken)),
            None => rake,
        }
    }
}

/// Rules fixed for the duration of one hand.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandConfig {
    pub blinds: Blinds,
    pub post_blinds: bool,
    pub rake: RakePolicy,
    pub odd_chip: OddChipRule,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            blinds: Blinds { small: 50, big: 100 },
            post_blinds: true,
            rake: RakePolicy::none(),
            odd_chip: OddChipRule::default(),
        }
    }
}

/// A seated player's part in one hand.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandPlayer {
    pub player_id: PlayerId,
    pub seat: SeatIndex,
    pub starting_stack: Chips,
    /// Chips behind, not yet committed.
    pub stack: Chips,
    pub hole_cards: Vec<Card>,
    /// Committed over the whole hand.
    pub committed: Chips,
    /// Committed in the current betting round.
    pub street_committed: Chips,
    pub folded: bool,
    pub all_in: bool,
    /// Left the table mid-hand; will be folded at their next action point.
    pub departed: bool,
    /// Uncommitted chips handed back on departure.
    pub withdrawn: Chips,
}

impl HandPlayer {
    pub fn new(player_id: PlayerId, seat: SeatIndex, stack: Chips) -> Self {
        Self {
            player_id,
            seat,
            starting_stack: stack,
            stack,
            hole_cards: Vec::with_capacity(2),
            committed: 0,
            street_committed: 0,
            folded: false,
            all_in: false,
            departed: false,
            withdrawn: 0,
        }
    }

    /// Still contesting the pot.
    pub fn is_contender(&self) -> bool {
        !self.folded
    }

    /// Can still make betting decisions.
    pub fn can_act(&self) -> bool {
        !self.folded && !self.all_in
    }
}

/// Everything known about a hand in progress. Players are kept in seat order.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandState {
    pub hand_id: HandId,
    pub table_id: TableId,
    pub config: HandConfig,
    pub button: SeatIndex,
    pub players: Vec<HandPlayer>,
    pub community_cards: Vec<Card>,
    pub pot: Chips,
    pub round: Round,
    pub action_on: Option<PlayerId>,
    pub last_aggressor: Option<PlayerId>,
    /// Smallest legal raise increment on this street.
    pub min_raise: Chips,
    /// Players who acted since the last full bet or raise on this street.
    pub acted: BTreeSet<PlayerId>,
    pub betting_history: Vec<BettingRecord>,
    pub shuffle_seed: ShuffleSeed,
    pub deck_commitment: String,
}

impl HandState {
    pub fn player(&self, player_id: PlayerId) -> Option<&HandPlayer> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    pub(crate) fn index_of(&self, player_id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.player_id == player_id)
    }

    pub fn folded(&self) -> BTreeSet<PlayerId> {
        self.players
            .iter()
            .filter(|p| p.folded)
            .map(|p| p.player_id)
            .collect()
    }

    pub fn committed(&self) -> BTreeMap<PlayerId, Chips> {
        self.players
            .iter()
            .map(|p| (p.player_id, p.committed))
            .collect()
    }

    pub fn contender_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_contender()).count()
    }

    pub fn able_count(&self) -> usize {
        self.players.iter().filter(|p| p.can_act()).count()
    }

    pub fn highest_street_commitment(&self) -> Chips {
        self.players
            .iter()
            .map(|p| p.street_committed)
            .max()
            .unwrap_or(0)
    }

    pub fn is_complete(&self) -> bool {
        self.round == Round::Complete
    }

    /// Player indices in clockwise order starting left of `seat`.
    pub(crate) fn clockwise_after_seat(&self, seat: SeatIndex) -> Vec<usize> {
        let split = self.players.partition_point(|p| p.seat <= seat);
        (split..self.players.len()).chain(0..split).collect()
    }

    /// Player indices in clockwise order starting left of the button.
    pub(crate) fn clockwise_from_button(&self) -> Vec<usize> {
        self.clockwise_after_seat(self.button)
    }

    /// Moves `amount` from a player's stack into the pot.
    pub(crate) fn commit(&mut self, index: usize, amount: Chips) -> HandResult<()> {
        let player = &mut self.players[index];
        player.stack = player.stack.checked_sub(amount).ok_or_else(|| {
            HandError::InvariantViolation(format!(
                "player {} committed {} with only {} behind",
                player.player_id, amount, player.stack
            ))
        })?;
        let overflow = || {
            HandError::InvariantViolation(format!(
                "committing {amount} overflows the chip count"
            ))
        };
        player.committed = player.committed.checked_add(amount).ok_or_else(overflow)?;
        player.street_committed = player
            .street_committed
            .checked_add(amount)
            .ok_or_else(overflow)?;
        if player.stack == 0 && !player.folded {
            player.all_in = true;
        }
        self.pot = self.pot.checked_add(amount).ok_or_else(overflow)?;
        Ok(())
    }

    /// Chip accounting that must hold after every transition.
    pub fn check_invariants(&self) -> HandResult<()> {
        let committed = checked_total(self.players.iter().map(|p| p.committed))?;
        if committed != self.pot {
            return Err(HandError::InvariantViolation(format!(
                "pot {} does not match committed chips {}",
                self.pot, committed
            )));
        }
        for player in &self.players {
            let holdings = checked_total([player.stack, player.committed, player.withdrawn])?;
            if holdings != player.starting_stack {
                return Err(HandError::InvariantViolation(format!(
                    "player {} chips do not add up to starting stack {}",
                    player.player_id, player.starting_stack
                )));
            }
        }
        if let Some(actor) = self.action_on {
            match self.player(actor) {
                Some(p) if p.can_act() => {}
                _ => {
                    return Err(HandError::InvariantViolation(format!(
                        "action is on player {actor} who cannot act"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Sum of chip amounts, failing instead of wrapping.
pub(crate) fn checked_total(amounts: impl IntoIterator<Item = Chips>) -> HandResult<Chips> {
    amounts
        .into_iter()
        .try_fold(0 as Chips, |total, amount| total.checked_add(amount))
        .ok_or_else(|| HandError::InvariantViolation("chip total overflows".to_string()))
}
