//! Audit records of finished hands and their independent verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::{
    deck::{DeckService, ShuffleSeed},
    entities::{Action, BettingRecord, Card, Chips, HandId, PlayerId, RecordedAction, SeatIndex, TableId},
    errors::HandError,
    hand::HandConfig,
    pots::PotAward,
    state_machine::{HandStateMachine, SeatedPlayer},
};

/// A player's part in a finished hand.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandParticipant {
    pub player_id: PlayerId,
    pub seat: SeatIndex,
    pub starting_stack: Chips,
    pub hole_cards: Vec<Card>,
    pub final_stack: Chips,
    pub departed: bool,
}

/// Immutable record of a finished hand. Written exactly once.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CompletedHand {
    pub hand_id: HandId,
    pub table_id: TableId,
    pub button: SeatIndex,
    pub config: HandConfig,
    pub participants: Vec<HandParticipant>,
    pub all_actions: Vec<BettingRecord>,
    pub community_cards: Vec<Card>,
    pub winners: Vec<PlayerId>,
    pub pot: Chips,
    pub pot_distribution: BTreeMap<PlayerId, Chips>,
    pub pots: Vec<PotAward>,
    pub rake: Chips,
    pub went_to_showdown: bool,
    pub shuffle_seed: ShuffleSeed,
    pub shuffle_algorithm: String,
    pub deck_commitment: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("hand was shuffled with {recorded}, verifier uses {available}")]
    AlgorithmMismatch {
        recorded: String,
        available: &'static str,
    },

    #[error("deck commitment does not match the shuffle seed")]
    CommitmentMismatch,

    #[error("recorded action {index} was rejected: {source}")]
    Rejected {
        index: usize,
        #[source]
        source: HandError,
    },

    #[error("replayed hand differs in {0}")]
    Diverged(&'static str),
}

impl CompletedHand {
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.participants.iter().map(|p| p.player_id).collect()
    }

    /// Chips moved into the pot by each player.
    pub fn contributions(&self) -> BTreeMap<PlayerId, Chips> {
        let mut totals = BTreeMap::new();
        for record in &self.all_actions {
            if record.action != RecordedAction::Departure {
                let total = totals.entry(record.player_id).or_insert(0 as Chips);
                *total = total.saturating_add(record.amount);
            }
        }
        totals
    }

    /// Re-deals the hand from its seed and re-applies every recorded
    /// decision, then checks cards, history and payouts against the record.
    ///
    /// # Errors
    ///
    /// * `ReplayError::CommitmentMismatch` - Seed does not produce the committed deck
    /// * `ReplayError::Rejected` - A recorded action is illegal on replay
    /// * `ReplayError::Diverged` - The replayed outcome differs from the record
    pub fn verify(&self, deck_service: &DeckService) -> Result<(), ReplayError> {
        if deck_service.algorithm() != self.shuffle_algorithm {
            return Err(ReplayError::AlgorithmMismatch {
                recorded: self.shuffle_algorithm.clone(),
                available: deck_service.algorithm(),
            });
        }

        let seats: Vec<SeatedPlayer> = self
            .participants
            .iter()
            .map(|p| SeatedPlayer {
                player_id: p.player_id,
                seat: p.seat,
                stack: p.starting_stack,
            })
            .collect();
        let mut hand = HandStateMachine::start(
            self.hand_id,
            self.table_id,
            &seats,
            self.button,
            self.shuffle_seed.clone(),
            deck_service,
            self.config,
        )
        .map_err(|source| ReplayError::Rejected { index: 0, source })?;
        if hand.state().deck_commitment != self.deck_commitment {
            return Err(ReplayError::CommitmentMismatch);
        }

        for (index, record) in self.all_actions.iter().enumerate() {
            let result = match record.action {
                RecordedAction::SmallBlind | RecordedAction::BigBlind | RecordedAction::Forfeit => {
                    continue;
                }
                RecordedAction::Departure => hand.depart(record.player_id).map(|_| ()),
                RecordedAction::Fold => hand.act(record.player_id, Action::Fold),
                RecordedAction::Check => hand.act(record.player_id, Action::Check),
                RecordedAction::Call => hand.act(record.player_id, Action::Call),
                RecordedAction::Bet => hand.act(record.player_id, Action::Bet(record.amount)),
                RecordedAction::Raise => hand.act(record.player_id, Action::Raise(record.amount)),
                RecordedAction::AllIn => hand.act(record.player_id, Action::AllIn),
            };
            result.map_err(|source| ReplayError::Rejected { index, source })?;
        }

        if !hand.is_complete() {
            return Err(ReplayError::Diverged("completion"));
        }
        let state = hand.state();
        if state.betting_history != self.all_actions {
            return Err(ReplayError::Diverged("betting history"));
        }
        if state.community_cards != self.community_cards {
            return Err(ReplayError::Diverged("community cards"));
        }
        for participant in &self.participants {
            let dealt = state.player(participant.player_id).map(|p| &p.hole_cards);
            if dealt != Some(&participant.hole_cards) {
                return Err(ReplayError::Diverged("hole cards"));
            }
        }
        let Some(settlement) = hand.settlement() else {
            return Err(ReplayError::Diverged("settlement"));
        };
        if settlement.distribution != self.pot_distribution || state.pot != self.pot {
            return Err(ReplayError::Diverged("pot distribution"));
        }
        if settlement.rake != self.rake {
            return Err(ReplayError::Diverged("rake"));
        }
        let final_stacks: BTreeMap<PlayerId, Chips> = hand.final_stacks().into_iter().collect();
        if self
            .participants
            .iter()
            .any(|p| final_stacks.get(&p.player_id) != Some(&p.final_stack))
        {
            return Err(ReplayError::Diverged("final stacks"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Blinds;
    use uuid::Uuid;

    fn finished_hand() -> CompletedHand {
        let service = DeckService::default();
        let seats = [
            SeatedPlayer { player_id: 10, seat: 0, stack: 200 },
            SeatedPlayer { player_id: 20, seat: 3, stack: 200 },
            SeatedPlayer { player_id: 30, seat: 5, stack: 80 },
        ];
        let config = HandConfig {
            blinds: Blinds { small: 5, big: 10 },
            ..HandConfig::default()
        };
        let mut hand = HandStateMachine::start(
            Uuid::new_v4(),
            4,
            &seats,
            0,
            service.generate_seed(),
            &service,
            config,
        )
        .unwrap();
        // Button (10) opens, small blind (20) re-raises, big blind (30)
        // shoves short and both callers complete.
        hand.act(10, Action::Raise(30)).unwrap();
        hand.act(20, Action::Raise(65)).unwrap();
        hand.act(30, Action::AllIn).unwrap();
        hand.act(10, Action::Call).unwrap();
        hand.act(20, Action::Call).unwrap();
        while let Some(actor) = hand.state().action_on {
            hand.act(actor, Action::Check).unwrap();
        }
        hand.into_completed(Utc::now()).unwrap()
    }

    #[test]
    fn test_completed_hand_verifies() {
        let record = finished_hand();
        assert_eq!(record.pot, 240);
        assert_eq!(record.pot_distribution.values().sum::<Chips>() + record.rake, record.pot);
        record.verify(&DeckService::default()).unwrap();
    }

    #[test]
    fn test_json_roundtrip_still_verifies() {
        let record = finished_hand();
        let json = serde_json::to_string(&record).unwrap();
        let back: CompletedHand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        back.verify(&DeckService::default()).unwrap();
    }

    #[test]
    fn test_tampered_record_is_caught() {
        let mut record = finished_hand();
        let (first, _) = record.pot_distribution.iter().next().map(|(k, v)| (*k, *v)).unwrap();
        *record.pot_distribution.get_mut(&first).unwrap() += 1;
        assert!(matches!(
            record.verify(&DeckService::default()),
            Err(ReplayError::Diverged("pot distribution"))
        ));

        let mut record = finished_hand();
        record.shuffle_seed = ShuffleSeed::from_bytes([9; 32]);
        assert!(matches!(
            record.verify(&DeckService::default()),
            Err(ReplayError::CommitmentMismatch)
        ));
    }

    #[test]
    fn test_oversized_stacks_are_rejected_not_wrapped() {
        let mut record = finished_hand();
        for participant in &mut record.participants {
            participant.starting_stack = Chips::MAX;
        }
        assert!(matches!(
            record.verify(&DeckService::default()),
            Err(ReplayError::Rejected { index: 0, source }) if source.is_invariant_violation()
        ));
    }

    #[test]
    fn test_contributions_sum_to_pot() {
        let record = finished_hand();
        let total: Chips = record.contributions().values().sum();
        assert_eq!(total, record.pot);
    }
}
