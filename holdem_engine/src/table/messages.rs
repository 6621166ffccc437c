//! Table actor message types.

use serde::Serialize;
use tokio::sync::oneshot;

use super::view::{ActionResult, GameState, TableSummary};
use crate::errors::EngineResult;
use crate::game::entities::{Action, Chips, HandId, PlayerId, SeatIndex};

/// Messages that can be sent to a TableActor
#[derive(Debug)]
pub enum TableMessage {
    /// Reserve the buy-in and take a seat
    Join {
        player_id: PlayerId,
        buy_in: Chips,
        seat: Option<SeatIndex>,
        response: oneshot::Sender<EngineResult<SeatIndex>>,
    },

    /// Leave the table and settle the reservation
    Leave {
        player_id: PlayerId,
        response: oneshot::Sender<EngineResult<LeaveOutcome>>,
    },

    /// Player action (fold, check, call, bet, raise, all-in)
    TakeAction {
        player_id: PlayerId,
        action: Action,
        response: oneshot::Sender<ActionResult>,
    },

    /// Start a hand if none is running and enough players hold chips
    StartRound {
        response: oneshot::Sender<EngineResult<Option<HandId>>>,
    },

    /// Get table state as seen by a player (or a spectator)
    GetState {
        player_id: Option<PlayerId>,
        response: oneshot::Sender<GameState>,
    },

    /// Get table summary
    GetSummary {
        response: oneshot::Sender<TableSummary>,
    },

    /// Cash everyone out and stop the actor
    Close {
        response: oneshot::Sender<CloseReport>,
    },

    /// Internal: periodic housekeeping
    Tick,
}

/// Result of leaving a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeaveOutcome {
    pub final_stack: Chips,
    /// Net result applied to the wallet. `None` when the settlement could not
    /// be written yet and is queued for retry, or waits for the showdown.
    pub delta: Option<i64>,
    /// Left all-in; the wallet is settled when the running hand completes
    pub awaiting_showdown: bool,
}

/// What happened to each seated player when a table closed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CloseReport {
    /// Players cashed out, with their final stacks
    pub settled: Vec<(PlayerId, Chips)>,
    /// Players whose chips could not be returned to their wallets
    pub unsettled: Vec<(PlayerId, Chips)>,
}

impl CloseReport {
    pub fn is_clean(&self) -> bool {
        self.unsettled.is_empty()
    }
}
