//! Seats, stacks and the dealer button of one table.
//!
//! A session runs at most one hand at a time. Stacks recorded here are the
//! chips each player held when the current hand started; while a hand is
//! running, the hand's own accounting is authoritative and is copied back
//! when the hand completes.

use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

use super::{
    config::TableConfig,
    errors::{TableError, TableResult},
    view::{ActionResult, GameState, RevealedHand, SeatView, ShowdownReveal, TableSummary},
};
use crate::game::{
    CompletedHand, HandStateMachine, SeatedPlayer,
    deck::{DeckService, ShuffleSeed},
    entities::{Action, ActionChoices, Chips, HandId, PlayerId, SeatIndex, TableId},
    errors::HandError,
};

/// A player who left the table and the chips they take with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    pub player_id: PlayerId,
    pub seat: SeatIndex,
    pub final_stack: Chips,
    /// Left while dealt into a running hand; committed chips stayed in the pot
    pub mid_hand: bool,
    /// Left all-in. `final_stack` only covers withdrawn chips; the rest is
    /// known once the hand completes and comes out of
    /// [`TableSession::drain_settled_departures`].
    pub awaiting_showdown: bool,
}

#[derive(Debug)]
pub struct TableSession {
    table_id: TableId,
    config: TableConfig,
    seats: Vec<Option<PlayerId>>,
    stacks: HashMap<PlayerId, Chips>,
    dealer_button: Option<SeatIndex>,
    hand: Option<HandStateMachine>,
    deck_service: DeckService,
    last_showdown: Option<ShowdownReveal>,
    hands_played: u64,
    completed: Vec<CompletedHand>,
    /// Players who left all-in, with their seats, until the hand completes
    awaiting_showdown: HashMap<PlayerId, SeatIndex>,
    settled_departures: Vec<Departure>,
}

impl TableSession {
    /// # Errors
    ///
    /// * `TableError::InvalidConfig` - The configuration does not validate
    pub fn new(
        table_id: TableId,
        config: TableConfig,
        deck_service: DeckService,
    ) -> TableResult<Self> {
        config.validate().map_err(TableError::InvalidConfig)?;
        Ok(Self {
            table_id,
            seats: vec![None; config.max_players],
            config,
            stacks: HashMap::new(),
            dealer_button: None,
            hand: None,
            deck_service,
            last_showdown: None,
            hands_played: 0,
            completed: Vec::new(),
            awaiting_showdown: HashMap::new(),
            settled_departures: Vec::new(),
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn dealer_button(&self) -> Option<SeatIndex> {
        self.dealer_button
    }

    pub fn hands_played(&self) -> u64 {
        self.hands_played
    }

    pub fn player_count(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_full(&self) -> bool {
        self.seats.iter().all(Option::is_some)
    }

    pub fn is_seated(&self, player_id: PlayerId) -> bool {
        self.stacks.contains_key(&player_id)
    }

    pub fn seat_of(&self, player_id: PlayerId) -> Option<SeatIndex> {
        self.seats.iter().position(|s| *s == Some(player_id))
    }

    pub fn active_hand(&self) -> Option<&HandStateMachine> {
        self.hand.as_ref()
    }

    pub fn has_active_hand(&self) -> bool {
        self.hand.is_some()
    }

    /// Chips a seated player currently holds behind.
    pub fn stack_of(&self, player_id: PlayerId) -> Option<Chips> {
        let table_stack = self.stacks.get(&player_id).copied()?;
        let in_hand = self
            .hand
            .as_ref()
            .and_then(|h| h.state().player(player_id))
            .filter(|p| !p.departed);
        Some(in_hand.map_or(table_stack, |p| p.stack))
    }

    /// Seat a player with `buy_in` chips.
    ///
    /// # Errors
    ///
    /// * `TableError::PlayerAlreadySeated` - The player already has a seat
    /// * `TableError::InvalidBuyIn` - Outside the table's buy-in limits
    /// * `TableError::SeatUnavailable` - Requested seat taken, or no open seat
    pub fn add_player(
        &mut self,
        player_id: PlayerId,
        buy_in: Chips,
        seat: Option<SeatIndex>,
    ) -> TableResult<SeatIndex> {
        if self.is_seated(player_id) {
            return Err(TableError::PlayerAlreadySeated(player_id));
        }
        if !self.config.accepts_buy_in(buy_in) {
            return Err(TableError::InvalidBuyIn {
                amount: buy_in,
                min: self.config.min_buy_in_chips(),
                max: self.config.max_buy_in_chips(),
            });
        }
        let seat = match seat {
            Some(seat) if self.seats.get(seat).is_some_and(Option::is_none) => seat,
            Some(seat) => return Err(TableError::SeatUnavailable(Some(seat))),
            None => self
                .seats
                .iter()
                .position(Option::is_none)
                .ok_or(TableError::SeatUnavailable(None))?,
        };

        self.seats[seat] = Some(player_id);
        self.stacks.insert(player_id, buy_in);
        log::info!(
            "Table {}: player {} sat at seat {} with {}",
            self.table_id,
            player_id,
            seat,
            buy_in
        );
        Ok(seat)
    }

    /// Free a player's seat.
    ///
    /// A player dealt into the running hand takes only their uncommitted
    /// chips; what they already put in stays in the pot and they are folded
    /// when the action reaches them. A player who is all-in keeps their claim
    /// on the pot and is paid out when the hand completes.
    ///
    /// # Errors
    ///
    /// * `TableError::PlayerNotSeated` - The player has no seat here
    pub fn remove_player(&mut self, player_id: PlayerId) -> TableResult<Departure> {
        let seat = self
            .seat_of(player_id)
            .ok_or(TableError::PlayerNotSeated(player_id))?;

        let hand_player = self
            .hand
            .as_ref()
            .and_then(|h| h.state().player(player_id))
            .filter(|p| !p.departed);
        let in_hand = hand_player.is_some();
        let all_in = hand_player.is_some_and(|p| p.all_in);
        let final_stack = match self.hand.as_mut() {
            Some(hand) if in_hand => hand.depart(player_id)?,
            _ => self.stacks.get(&player_id).copied().unwrap_or(0),
        };

        self.seats[seat] = None;
        self.stacks.remove(&player_id);
        log::info!(
            "Table {}: player {} left seat {} with {}",
            self.table_id,
            player_id,
            seat,
            final_stack
        );
        if all_in {
            self.awaiting_showdown.insert(player_id, seat);
        }
        if in_hand {
            self.finish_hand_if_complete()?;
        }

        // The hand may have completed on this departure.
        if let Some(index) = self
            .settled_departures
            .iter()
            .position(|d| d.player_id == player_id)
        {
            return Ok(self.settled_departures.remove(index));
        }

        Ok(Departure {
            player_id,
            seat,
            final_stack,
            mid_hand: in_hand,
            awaiting_showdown: all_in,
        })
    }

    /// Start a hand when none is running and at least two seated players
    /// hold chips.
    ///
    /// # Returns
    ///
    /// * `TableResult<Option<HandId>>` - The new hand, or `None` if not ready
    pub fn start_round_if_ready(&mut self) -> TableResult<Option<HandId>> {
        self.start_round(None)
    }

    /// Like [`Self::start_round_if_ready`] with a caller-supplied seed.
    ///
    /// # Errors
    ///
    /// * `TableError::Deck` - The seed is not 64 hex characters
    pub fn start_round_with_seed(&mut self, seed: &str) -> TableResult<Option<HandId>> {
        let seed = ShuffleSeed::parse(seed)?;
        self.start_round(Some(seed))
    }

    fn start_round(&mut self, seed: Option<ShuffleSeed>) -> TableResult<Option<HandId>> {
        if self.hand.is_some() {
            return Ok(None);
        }
        let eligible: Vec<(SeatIndex, PlayerId)> = self
            .seats
            .iter()
            .enumerate()
            .filter_map(|(seat, player)| player.map(|p| (seat, p)))
            .filter(|(_, p)| self.stacks.get(p).is_some_and(|s| *s > 0))
            .collect();
        if eligible.len() < 2 {
            return Ok(None);
        }

        let first = eligible[0].0;
        let button = match self.dealer_button {
            Some(previous) => eligible
                .iter()
                .map(|(seat, _)| *seat)
                .find(|seat| *seat > previous)
                .unwrap_or(first),
            None => first,
        };
        let players: Vec<SeatedPlayer> = eligible
            .iter()
            .map(|&(seat, player_id)| SeatedPlayer {
                player_id,
                seat,
                stack: self.stacks.get(&player_id).copied().unwrap_or(0),
            })
            .collect();

        let seed = seed.unwrap_or_else(|| self.deck_service.generate_seed());
        let hand = HandStateMachine::start(
            Uuid::new_v4(),
            self.table_id,
            &players,
            button,
            seed,
            &self.deck_service,
            self.config.hand_config(),
        )?;
        let hand_id = hand.hand_id();
        log::info!(
            "Table {}: hand {} started, button at seat {}, {} players",
            self.table_id,
            hand_id,
            button,
            players.len()
        );
        self.dealer_button = Some(button);
        self.hand = Some(hand);
        self.finish_hand_if_complete()?;
        Ok(Some(hand_id))
    }

    /// Apply a player's decision to the running hand.
    ///
    /// # Errors
    ///
    /// * `TableError::PlayerNotSeated` - The player has no seat here
    /// * `HandError::NoActiveHand` - No hand is running
    /// * `HandError::IllegalAction` - Rejected; nothing changed
    pub fn apply_action(&mut self, player_id: PlayerId, action: Action) -> TableResult<()> {
        if !self.is_seated(player_id) {
            return Err(TableError::PlayerNotSeated(player_id));
        }
        let hand = self.hand.as_mut().ok_or(HandError::NoActiveHand)?;
        hand.act(player_id, action)?;
        self.finish_hand_if_complete()
    }

    /// [`Self::apply_action`] reported as an [`ActionResult`].
    pub fn process_action(&mut self, player_id: PlayerId, action: Action) -> ActionResult {
        match self.apply_action(player_id, action) {
            Ok(()) => ActionResult::accepted(self.view_for(Some(player_id))),
            Err(e) => ActionResult::rejected(e.to_string()),
        }
    }

    fn finish_hand_if_complete(&mut self) -> TableResult<()> {
        if !self.hand.as_ref().is_some_and(HandStateMachine::is_complete) {
            return Ok(());
        }
        let Some(hand) = self.hand.take() else {
            return Ok(());
        };

        let revealed: Vec<RevealedHand> = hand
            .state()
            .players
            .iter()
            .filter(|p| !p.folded)
            .map(|p| RevealedHand {
                player_id: p.player_id,
                seat: p.seat,
                hole_cards: p.hole_cards.clone(),
            })
            .collect();
        let completed = hand.into_completed(Utc::now())?;

        for participant in &completed.participants {
            if !participant.departed {
                if let Some(stack) = self.stacks.get_mut(&participant.player_id) {
                    *stack = participant.final_stack;
                }
            } else if let Some(seat) = self.awaiting_showdown.remove(&participant.player_id) {
                self.settled_departures.push(Departure {
                    player_id: participant.player_id,
                    seat,
                    final_stack: participant.final_stack,
                    mid_hand: true,
                    awaiting_showdown: false,
                });
            }
        }
        self.last_showdown = completed.went_to_showdown.then(|| ShowdownReveal {
            hand_id: completed.hand_id,
            hands: revealed,
            winners: completed.winners.clone(),
        });
        self.hands_played += 1;
        log::info!(
            "Table {}: hand {} complete, pot {}, rake {}, winners {:?}",
            self.table_id,
            completed.hand_id,
            completed.pot,
            completed.rake,
            completed.winners
        );
        self.completed.push(completed);
        Ok(())
    }

    /// Table state as `viewer` may see it. `None` gives a spectator view.
    pub fn view_for(&self, viewer: Option<PlayerId>) -> GameState {
        let state = self.hand.as_ref().map(HandStateMachine::state);
        let seats = self
            .seats
            .iter()
            .enumerate()
            .filter_map(|(seat, player)| player.map(|p| (seat, p)))
            .map(|(seat, player_id)| {
                let table_stack = self.stacks.get(&player_id).copied().unwrap_or(0);
                match state.and_then(|s| s.player(player_id)).filter(|p| !p.departed) {
                    Some(p) => SeatView {
                        seat,
                        player_id,
                        stack: p.stack,
                        committed: p.committed,
                        street_committed: p.street_committed,
                        in_hand: true,
                        folded: p.folded,
                        all_in: p.all_in,
                    },
                    None => SeatView {
                        seat,
                        player_id,
                        stack: table_stack,
                        committed: 0,
                        street_committed: 0,
                        in_hand: false,
                        folded: false,
                        all_in: false,
                    },
                }
            })
            .collect();

        let hole_cards = viewer
            .and_then(|v| state.and_then(|s| s.player(v)))
            .map(|p| p.hole_cards.clone())
            .unwrap_or_default();
        let available_actions = match (viewer, self.hand.as_ref()) {
            (Some(v), Some(hand)) if self.is_seated(v) => hand.legal_actions(v),
            _ => ActionChoices::default(),
        };

        GameState {
            table_id: self.table_id,
            table_name: self.config.name.clone(),
            blinds: self.config.blinds(),
            max_players: self.config.max_players,
            hands_played: self.hands_played,
            button: self.dealer_button,
            hand_id: state.map(|s| s.hand_id),
            round: state.map(|s| s.round),
            pot: state.map_or(0, |s| s.pot),
            community_cards: state.map(|s| s.community_cards.clone()).unwrap_or_default(),
            action_on: state.and_then(|s| s.action_on),
            seats,
            viewer,
            hole_cards,
            available_actions,
            last_showdown: self.last_showdown.clone(),
        }
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            table_id: self.table_id,
            name: self.config.name.clone(),
            player_count: self.player_count(),
            max_players: self.config.max_players,
            blinds: self.config.blinds(),
            hand_in_progress: self.hand.is_some(),
            hands_played: self.hands_played,
            halted: false,
        }
    }

    /// Seated players in seat order.
    pub fn seated_players(&self) -> Vec<PlayerId> {
        self.seats.iter().flatten().copied().collect()
    }

    /// Hands finished since the last drain, oldest first.
    pub fn drain_completed_hands(&mut self) -> Vec<CompletedHand> {
        std::mem::take(&mut self.completed)
    }

    /// Players who left all-in, once the hand they left settled.
    pub fn drain_settled_departures(&mut self) -> Vec<Departure> {
        std::mem::take(&mut self.settled_departures)
    }

    /// Players who left all-in whose hand is still running.
    pub fn awaiting_showdown(&self) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self.awaiting_showdown.keys().copied().collect();
        players.sort_unstable();
        players
    }
}
