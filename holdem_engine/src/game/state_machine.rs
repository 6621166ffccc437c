//! Lifecycle of a single hand.
//!
//! The machine moves PREFLOP → FLOP → TURN → RIVER → SHOWDOWN → COMPLETE,
//! dealing community cards as each betting round closes. It jumps straight to
//! COMPLETE when a single contender remains, and deals the remaining streets
//! without pause once nobody is left to bet.

use chrono::{DateTime, Utc};
use log::{debug, error};

use super::{
    deck::{Deck, DeckService, ShuffleSeed, deck_commitment},
    entities::{
        Action, ActionChoices, BettingRecord, Chips, HandId, PlayerId, RecordedAction, Round,
        SeatIndex, TableId,
    },
    errors::{HandError, HandResult, IllegalReason},
    hand::{HandConfig, HandPlayer, HandState, checked_total},
    history::{CompletedHand, HandParticipant},
    pots::{Settlement, settle_hand},
    rules,
};

/// A player taking a seat in a new hand.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SeatedPlayer {
    pub player_id: PlayerId,
    pub seat: SeatIndex,
    pub stack: Chips,
}

/// Drives one hand from the deal to settlement.
#[derive(Debug)]
pub struct HandStateMachine {
    state: HandState,
    deck: Deck,
    algorithm: &'static str,
    settlement: Option<Settlement>,
    went_to_showdown: bool,
}

impl HandStateMachine {
    /// Shuffles, deals hole cards and posts blinds.
    ///
    /// Players without chips are left out. Hole cards go one at a time,
    /// starting left of the button.
    ///
    /// # Errors
    ///
    /// * `HandError::NotEnoughPlayers` - Fewer than two players hold chips
    /// * `HandError::InvariantViolation` - The stacks add up past the chip counter
    pub fn start(
        hand_id: HandId,
        table_id: TableId,
        seats: &[SeatedPlayer],
        button: SeatIndex,
        seed: ShuffleSeed,
        deck_service: &DeckService,
        config: HandConfig,
    ) -> HandResult<Self> {
        let mut players: Vec<HandPlayer> = seats
            .iter()
            .filter(|s| s.stack > 0)
            .map(|s| HandPlayer::new(s.player_id, s.seat, s.stack))
            .collect();
        if players.len() < 2 {
            return Err(HandError::NotEnoughPlayers(players.len()));
        }
        players.sort_by_key(|p| p.seat);
        checked_total(players.iter().map(|p| p.starting_stack))?;

        let deck = deck_service.shuffled_deck(&seed);
        let state = HandState {
            hand_id,
            table_id,
            config,
            button,
            players,
            community_cards: Vec::with_capacity(5),
            pot: 0,
            round: Round::Preflop,
            action_on: None,
            last_aggressor: None,
            min_raise: config.blinds.big.max(1),
            acted: Default::default(),
            betting_history: vec![],
            shuffle_seed: seed,
            deck_commitment: deck_commitment(deck.cards()),
        };
        let mut machine = Self {
            state,
            deck,
            algorithm: deck_service.algorithm(),
            settlement: None,
            went_to_showdown: false,
        };
        machine.deal_hole_cards()?;
        machine.post_blinds_and_open()?;
        machine.state.check_invariants()?;
        Ok(machine)
    }

    fn deal_hole_cards(&mut self) -> HandResult<()> {
        let order = self.state.clockwise_from_button();
        for _ in 0..2 {
            for &index in &order {
                let card = self.deck.deal_card()?;
                self.state.players[index].hole_cards.push(card);
            }
        }
        Ok(())
    }

    fn post_blinds_and_open(&mut self) -> HandResult<()> {
        let order = self.state.clockwise_from_button();
        // Heads-up the button posts the small blind and acts first.
        let (small, big, first) = if order.len() == 2 {
            (order[1], order[0], order[1])
        } else {
            (order[0], order[1], order[2])
        };

        if self.state.config.post_blinds {
            let blinds = self.state.config.blinds;
            self.post_blind(small, blinds.small, RecordedAction::SmallBlind)?;
            self.post_blind(big, blinds.big, RecordedAction::BigBlind)?;
        }

        self.state.action_on = rules::next_to_act_from(&self.state, first);
        self.progress()
    }

    fn post_blind(&mut self, index: usize, blind: Chips, action: RecordedAction) -> HandResult<()> {
        let amount = blind.min(self.state.players[index].stack);
        self.state.commit(index, amount)?;
        self.state.betting_history.push(BettingRecord {
            player_id: self.state.players[index].player_id,
            round: Round::Preflop,
            action,
            amount,
        });
        Ok(())
    }

    pub fn state(&self) -> &HandState {
        &self.state
    }

    pub fn hand_id(&self) -> HandId {
        self.state.hand_id
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    pub fn settlement(&self) -> Option<&Settlement> {
        self.settlement.as_ref()
    }

    pub fn legal_actions(&self, player_id: PlayerId) -> ActionChoices {
        rules::legal_actions(&self.state, player_id)
    }

    /// Applies a player's decision and advances the hand as far as it goes
    /// without further input.
    ///
    /// # Errors
    ///
    /// * `HandError::IllegalAction` - Rejected; the hand is unchanged
    /// * `HandError::InvariantViolation` - Chip accounting failed
    pub fn act(&mut self, player_id: PlayerId, action: Action) -> HandResult<()> {
        let next = rules::apply_action(&self.state, player_id, action)?;
        next.check_invariants()?;
        self.state = next;
        self.progress()?;
        self.state.check_invariants()
    }

    /// Marks a player as gone and hands back their uncommitted chips.
    /// Committed chips stay in the pot; the player is folded once the action
    /// reaches them, when they are the only thing keeping the hand open, or
    /// before the showdown. A player who is already all-in has no action
    /// left to forfeit and stays in for the showdown.
    pub fn depart(&mut self, player_id: PlayerId) -> HandResult<Chips> {
        let index = self
            .state
            .index_of(player_id)
            .ok_or(IllegalReason::NotInHand(player_id))?;
        let round = self.state.round;
        let player = &mut self.state.players[index];
        if player.departed {
            return Ok(0);
        }
        let returned = player.stack;
        player.stack = 0;
        player.withdrawn = returned;
        player.departed = true;
        self.state.betting_history.push(BettingRecord {
            player_id,
            round,
            action: RecordedAction::Departure,
            amount: returned,
        });
        debug!("Hand {}: player {} departed with {}", self.state.hand_id, player_id, returned);

        if !self.is_complete() {
            self.progress()?;
        }
        self.state.check_invariants()?;
        Ok(returned)
    }

    /// Folds a player out of turn.
    pub fn forfeit(&mut self, player_id: PlayerId) -> HandResult<()> {
        self.state = rules::forfeit(&self.state, player_id)?;
        self.progress()?;
        self.state.check_invariants()
    }

    /// Advances through every transition that needs no player input.
    fn progress(&mut self) -> HandResult<()> {
        loop {
            if self.state.is_complete() {
                return Ok(());
            }
            self.forfeit_if_uncontested()?;
            if self.state.contender_count() <= 1 {
                return self.finish(false);
            }

            if let Some(actor) = self.state.action_on
                && self.state.player(actor).is_some_and(|p| p.departed)
            {
                self.state = rules::forfeit(&self.state, actor)?;
                continue;
            }
            if !rules::round_complete(&self.state) {
                return Ok(());
            }

            match self.state.round.next_street() {
                Some(street) => self.deal_street(street)?,
                None => {
                    self.forfeit_departed(false)?;
                    if self.state.contender_count() <= 1 {
                        return self.finish(false);
                    }
                    self.state.round = Round::Showdown;
                    return self.finish(true);
                }
            }
        }
    }

    /// Departed players who could still act are folded once at most one
    /// live contender is left.
    fn forfeit_if_uncontested(&mut self) -> HandResult<()> {
        let live = self
            .state
            .players
            .iter()
            .filter(|p| p.is_contender() && !p.departed)
            .count();
        if live <= 1 {
            self.forfeit_departed(true)?;
        }
        Ok(())
    }

    fn forfeit_departed(&mut self, keep_last: bool) -> HandResult<()> {
        let departed: Vec<PlayerId> = self
            .state
            .players
            .iter()
            .filter(|p| p.is_contender() && p.departed && !p.all_in)
            .map(|p| p.player_id)
            .collect();
        for player_id in departed {
            if self.state.contender_count() <= 1 && keep_last {
                break;
            }
            self.state = rules::forfeit(&self.state, player_id)?;
        }
        Ok(())
    }

    fn deal_street(&mut self, street: Round) -> HandResult<()> {
        self.deck.burn_card()?;
        for _ in 0..street.cards_revealed() {
            let card = self.deck.deal_card()?;
            self.state.community_cards.push(card);
        }
        self.state.round = street;
        for player in &mut self.state.players {
            player.street_committed = 0;
        }
        self.state.acted.clear();
        self.state.last_aggressor = None;
        self.state.min_raise = self.state.config.blinds.big.max(1);
        let start = self
            .state
            .clockwise_from_button()
            .first()
            .copied()
            .unwrap_or(0);
        self.state.action_on = rules::next_to_act_from(&self.state, start);
        debug!(
            "Hand {}: dealt {} {:?}",
            self.state.hand_id, street, self.state.community_cards
        );
        Ok(())
    }

    fn finish(&mut self, showdown: bool) -> HandResult<()> {
        self.state.action_on = None;
        let settlement = settle_hand(&self.state)?;
        for winner in settlement.distribution.keys() {
            if self
                .state
                .player(*winner)
                .is_none_or(|p| p.departed && !p.all_in)
            {
                error!(
                    "Hand {}: pot awarded to player {} who is no longer seated",
                    self.state.hand_id, winner
                );
                return Err(HandError::InvariantViolation(format!(
                    "pot awarded to departed player {winner}"
                )));
            }
        }
        self.state.round = Round::Complete;
        self.went_to_showdown = showdown;
        self.settlement = Some(settlement);
        Ok(())
    }

    /// Stack each participant walks away with once the hand is settled.
    /// Departed players get what they withdrew plus anything they won.
    pub fn final_stacks(&self) -> Vec<(PlayerId, Chips)> {
        let distribution = self.settlement.as_ref().map(|s| &s.distribution);
        self.state
            .players
            .iter()
            .map(|p| {
                let won = distribution
                    .and_then(|d| d.get(&p.player_id))
                    .copied()
                    .unwrap_or(0);
                (p.player_id, p.stack + p.withdrawn + won)
            })
            .collect()
    }

    /// Converts a finished hand into its audit record.
    ///
    /// # Errors
    ///
    /// * `HandError::NoActiveHand` - The hand has not completed yet
    pub fn into_completed(self, completed_at: DateTime<Utc>) -> HandResult<CompletedHand> {
        let final_stacks = self.final_stacks();
        let Some(settlement) = self.settlement else {
            return Err(HandError::NoActiveHand);
        };
        let state = self.state;
        let participants = state
            .players
            .iter()
            .zip(final_stacks)
            .map(|(p, (_, final_stack))| HandParticipant {
                player_id: p.player_id,
                seat: p.seat,
                starting_stack: p.starting_stack,
                hole_cards: p.hole_cards.clone(),
                final_stack,
                departed: p.departed,
            })
            .collect();
        Ok(CompletedHand {
            hand_id: state.hand_id,
            table_id: state.table_id,
            button: state.button,
            config: state.config,
            participants,
            winners: settlement.winners(),
            pot: state.pot,
            rake: settlement.rake,
            pot_distribution: settlement.distribution,
            pots: settlement.pots,
            all_actions: state.betting_history,
            community_cards: state.community_cards,
            went_to_showdown: self.went_to_showdown,
            shuffle_seed: state.shuffle_seed,
            shuffle_algorithm: self.algorithm.to_string(),
            deck_commitment: state.deck_commitment,
            completed_at,
        })
    }
}
