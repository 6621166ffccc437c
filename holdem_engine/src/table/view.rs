//! Player-facing snapshots of a table.

use serde::{Deserialize, Serialize};

use crate::game::entities::{
    ActionChoices, Blinds, Card, Chips, HandId, PlayerId, Round, SeatIndex, TableId,
};

/// One occupied seat as seen by anyone at the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatView {
    pub seat: SeatIndex,
    pub player_id: PlayerId,
    /// Chips behind, excluding anything committed this hand
    pub stack: Chips,
    pub committed: Chips,
    pub street_committed: Chips,
    pub in_hand: bool,
    pub folded: bool,
    pub all_in: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedHand {
    pub player_id: PlayerId,
    pub seat: SeatIndex,
    pub hole_cards: Vec<Card>,
}

/// Hole cards shown at the most recent showdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowdownReveal {
    pub hand_id: HandId,
    pub hands: Vec<RevealedHand>,
    pub winners: Vec<PlayerId>,
}

/// Table state from one player's point of view.
///
/// Only the viewer's own hole cards are included; other players' cards
/// appear solely through `last_showdown`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub table_id: TableId,
    pub table_name: String,
    pub blinds: Blinds,
    pub max_players: usize,
    pub hands_played: u64,
    pub button: Option<SeatIndex>,
    pub hand_id: Option<HandId>,
    pub round: Option<Round>,
    pub pot: Chips,
    pub community_cards: Vec<Card>,
    pub action_on: Option<PlayerId>,
    pub seats: Vec<SeatView>,
    pub viewer: Option<PlayerId>,
    pub hole_cards: Vec<Card>,
    pub available_actions: ActionChoices,
    pub last_showdown: Option<ShowdownReveal>,
}

impl GameState {
    pub fn seat_of(&self, player_id: PlayerId) -> Option<&SeatView> {
        self.seats.iter().find(|s| s.player_id == player_id)
    }

    pub fn is_viewers_turn(&self) -> bool {
        self.viewer.is_some() && self.viewer == self.action_on
    }
}

/// Outcome of a submitted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub error_reason: Option<String>,
    pub new_state: Option<GameState>,
}

impl ActionResult {
    pub fn accepted(new_state: GameState) -> Self {
        Self {
            success: true,
            error_reason: None,
            new_state: Some(new_state),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error_reason: Some(reason.into()),
            new_state: None,
        }
    }
}

/// Table summary for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub table_id: TableId,
    pub name: String,
    pub player_count: usize,
    pub max_players: usize,
    pub blinds: Blinds,
    pub hand_in_progress: bool,
    pub hands_played: u64,
    pub halted: bool,
}
