//! Side pots, rake and payouts.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::{
    entities::{Card, Chips, PlayerId},
    errors::{HandError, HandResult},
    hand::{HandPlayer, HandState, OddChipRule},
    ranking::{HandRank, rank_hand},
};

/// One layer of the pot and who can win it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Pot {
    pub amount: Chips,
    /// Commitment level that caps this layer.
    pub level: Chips,
    pub contributors: Vec<PlayerId>,
    pub eligible: Vec<PlayerId>,
}

impl Pot {
    /// Chips nobody matched, returned to the only player who put them in.
    pub fn is_uncalled(&self) -> bool {
        self.eligible.len() == 1 && self.contributors == self.eligible
    }
}

/// Splits committed chips into a main pot and side pots.
///
/// Levels are the commitments of all-in contenders plus the largest
/// commitment of any contender. Each layer takes every player's chips between
/// the previous level and its own, folded players included; eligible are the
/// contenders who reached the level. Folded chips above the top level go to
/// the top layer.
pub fn build_side_pots(players: &[HandPlayer]) -> Vec<Pot> {
    let mut levels: Vec<Chips> = players
        .iter()
        .filter(|p| p.is_contender() && p.all_in && p.committed > 0)
        .map(|p| p.committed)
        .collect();
    if let Some(top) = players
        .iter()
        .filter(|p| p.is_contender())
        .map(|p| p.committed)
        .max()
        && top > 0
    {
        levels.push(top);
    }
    levels.sort_unstable();
    levels.dedup();

    let mut pots: Vec<Pot> = Vec::with_capacity(levels.len());
    let mut previous = 0;
    for level in levels {
        let amount: Chips = players
            .iter()
            .map(|p| p.committed.min(level) - p.committed.min(previous))
            .sum();
        let contributors = players
            .iter()
            .filter(|p| p.committed > previous)
            .map(|p| p.player_id)
            .collect();
        let eligible = players
            .iter()
            .filter(|p| p.is_contender() && p.committed >= level)
            .map(|p| p.player_id)
            .collect();
        pots.push(Pot {
            amount,
            level,
            contributors,
            eligible,
        });
        previous = level;
    }

    let excess: Chips = players
        .iter()
        .map(|p| p.committed.saturating_sub(previous))
        .sum();
    if excess > 0
        && let Some(top) = pots.last_mut()
    {
        top.amount += excess;
        let above: Vec<PlayerId> = players
            .iter()
            .filter(|p| p.committed > previous)
            .map(|p| p.player_id)
            .collect();
        merge_ids(&mut top.contributors, &above);
    }
    pots
}

fn merge_ids(into: &mut Vec<PlayerId>, from: &[PlayerId]) {
    for id in from {
        if !into.contains(id) {
            into.push(*id);
        }
    }
}

/// How one pot was paid out.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PotAward {
    pub amount: Chips,
    pub rake: Chips,
    pub eligible: Vec<PlayerId>,
    /// Winners in payout priority; the first received any odd chips.
    pub winners: Vec<PlayerId>,
    /// Rank of the winning hand when the pot went to showdown.
    pub winning_rank: Option<HandRank>,
    pub shares: BTreeMap<PlayerId, Chips>,
}

/// Payouts for a finished hand.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Settlement {
    pub pots: Vec<PotAward>,
    pub distribution: BTreeMap<PlayerId, Chips>,
    pub rake: Chips,
}

impl Settlement {
    /// Everyone who won at least one pot, in the order first awarded.
    pub fn winners(&self) -> Vec<PlayerId> {
        let mut winners = vec![];
        for award in &self.pots {
            merge_ids(&mut winners, &award.winners);
        }
        winners
    }

    pub fn total_paid(&self) -> Chips {
        self.distribution.values().sum()
    }
}

/// Ranks each contender's best hand from hole cards and the board.
pub fn showdown_ranks(state: &HandState) -> HashMap<PlayerId, HandRank> {
    state
        .players
        .iter()
        .filter(|p| p.is_contender())
        .map(|p| {
            let cards: Vec<Card> = p
                .hole_cards
                .iter()
                .chain(state.community_cards.iter())
                .copied()
                .collect();
            (p.player_id, rank_hand(&cards))
        })
        .collect()
}

/// Computes rake and winnings for every pot of a finished hand.
///
/// # Errors
///
/// * `HandError::InvariantViolation` - Payouts plus rake do not add up to the pot
pub fn settle_hand(state: &HandState) -> HandResult<Settlement> {
    let config = &state.config;
    let pots = build_side_pots(&state.players);
    let flop_seen = !state.community_cards.is_empty();
    let ranks = if state.contender_count() > 1 {
        showdown_ranks(state)
    } else {
        HashMap::new()
    };

    let priority: HashMap<PlayerId, usize> = match config.odd_chip {
        OddChipRule::ClockwiseFromButton => state
            .clockwise_from_button()
            .into_iter()
            .enumerate()
            .map(|(order, index)| (state.players[index].player_id, order))
            .collect(),
        OddChipRule::LowestSeat => state
            .players
            .iter()
            .map(|p| (p.player_id, p.seat))
            .collect(),
    };

    let mut settlement = Settlement::default();
    for pot in pots {
        let rake = if pot.is_uncalled() || (config.rake.no_flop_no_drop && !flop_seen) {
            0
        } else {
            config.rake.rake_for(pot.amount, settlement.rake)
        };
        settlement.rake += rake;
        let net = pot.amount - rake;

        let (mut winners, winning_rank) = if pot.eligible.len() == 1 {
            (pot.eligible.clone(), None)
        } else {
            let best = pot
                .eligible
                .iter()
                .filter_map(|id| ranks.get(id))
                .max()
                .cloned();
            let winners: Vec<PlayerId> = pot
                .eligible
                .iter()
                .copied()
                .filter(|id| best.is_some() && ranks.get(id) == best.as_ref())
                .collect();
            (winners, best)
        };
        if winners.is_empty() {
            return Err(HandError::InvariantViolation(format!(
                "pot of {} has no winner",
                pot.amount
            )));
        }
        winners.sort_by_key(|id| priority.get(id).copied().unwrap_or(usize::MAX));

        let count = winners.len() as Chips;
        let share = net / count;
        let remainder = net % count;
        let mut shares = BTreeMap::new();
        for (i, winner) in winners.iter().enumerate() {
            let amount = if i == 0 { share + remainder } else { share };
            shares.insert(*winner, amount);
            *settlement.distribution.entry(*winner).or_insert(0) += amount;
        }

        settlement.pots.push(PotAward {
            amount: pot.amount,
            rake,
            eligible: pot.eligible,
            winners,
            winning_rank,
            shares,
        });
    }

    let accounted = settlement.total_paid() + settlement.rake;
    if accounted != state.pot {
        return Err(HandError::InvariantViolation(format!(
            "settlement pays {} of a {} pot",
            accounted, state.pot
        )));
    }
    Ok(settlement)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: PlayerId, committed: Chips, folded: bool, all_in: bool) -> HandPlayer {
        let mut p = HandPlayer::new(id, id as usize, committed + if all_in { 0 } else { 100 });
        p.stack -= committed;
        p.committed = committed;
        p.folded = folded;
        p.all_in = all_in;
        p
    }

    #[test]
    fn test_single_pot_without_all_ins() {
        let pots = build_side_pots(&[player(1, 30, false, false), player(2, 30, false, false), player(3, 10, true, false)]);
        assert_eq!(pots.len(), 1);
        assert_eq!(pots[0].amount, 70);
        assert_eq!(pots[0].eligible, vec![1, 2]);
        assert_eq!(pots[0].contributors, vec![1, 2, 3]);
    }

    #[test]
    fn test_three_way_side_pot() {
        let pots = build_side_pots(&[player(1, 50, false, true), player(2, 150, false, false), player(3, 150, false, false)]);
        assert_eq!(pots.len(), 2);
        assert_eq!((pots[0].amount, pots[0].eligible.clone()), (150, vec![1, 2, 3]));
        assert_eq!((pots[1].amount, pots[1].eligible.clone()), (200, vec![2, 3]));
    }

    #[test]
    fn test_uncalled_excess_is_its_own_pot() {
        let pots = build_side_pots(&[player(1, 40, false, true), player(2, 100, false, false)]);
        assert_eq!(pots.len(), 2);
        assert_eq!(pots[0].amount, 80);
        assert!(pots[1].is_uncalled());
        assert_eq!(pots[1].amount, 60);
    }

    #[test]
    fn test_folded_excess_joins_top_pot() {
        // A folded player put in more than the all-in contenders.
        let pots = build_side_pots(&[player(1, 20, false, true), player(2, 30, false, true), player(3, 60, true, false)]);
        let total: Chips = pots.iter().map(|p| p.amount).sum();
        assert_eq!(total, 110);
        assert_eq!(pots.len(), 2);
        assert_eq!(pots[0].amount, 60);
        assert_eq!(pots[1].amount, 50);
        assert_eq!(pots[1].eligible, vec![2]);
        assert_eq!(pots[1].contributors, vec![2, 3]);
        assert!(!pots[1].is_uncalled());
    }

    #[test]
    fn test_blind_folded_to_short_caller() {
        // Big blind 10 folds after the small blind went all-in for 5.
        let pots = build_side_pots(&[player(1, 5, false, true), player(2, 10, true, false)]);
        assert_eq!(pots.len(), 1);
        assert_eq!(pots[0].amount, 15);
        assert_eq!(pots[0].eligible, vec![1]);
    }

    #[test]
    fn test_rake_policy_rounds_down_and_caps() {
        let rake = crate::game::hand::RakePolicy {
            basis_points: 500,
            cap: Some(3),
            no_flop_no_drop: false,
        };
        assert_eq!(rake.rake_for(39, 0), 1);
        assert_eq!(rake.rake_for(100, 0), 3);
        assert_eq!(rake.rake_for(100, 2), 1);
    }
}
