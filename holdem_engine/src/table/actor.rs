//! Table actor implementation with async message handling.

use std::sync::Arc;
use tokio::{
    sync::{mpsc, oneshot},
    time::{Duration, MissedTickBehavior, interval},
};

use super::{
    config::TableConfig,
    errors::{TableError, TableResult},
    messages::{CloseReport, LeaveOutcome, TableMessage},
    session::TableSession,
    view::{ActionResult, TableSummary},
};
use crate::{
    db::HistoryRecorder,
    errors::{EngineError, EngineResult},
    game::{
        deck::DeckService,
        entities::{Action, Chips, HandId, PlayerId, SeatIndex, TableId},
    },
    telemetry,
    wallet::{WalletError, WalletLedger},
};

/// Capacity of each table's inbox
pub const INBOX_CAPACITY: usize = 100;

/// Table actor handle for sending messages
#[derive(Clone, Debug)]
pub struct TableHandle {
    sender: mpsc::Sender<TableMessage>,
    table_id: TableId,
}

impl TableHandle {
    /// Create a new table handle
    pub fn new(sender: mpsc::Sender<TableMessage>, table_id: TableId) -> Self {
        Self { sender, table_id }
    }

    /// Get table ID
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the table
    pub async fn send(&self, message: TableMessage) -> EngineResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| EngineError::TableClosed(self.table_id))
    }

    /// Send a message carrying a reply channel and wait for the reply
    pub async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> TableMessage,
    ) -> EngineResult<T> {
        let (response, reply) = oneshot::channel();
        self.send(message(response)).await?;
        reply
            .await
            .map_err(|_| EngineError::TableClosed(self.table_id))
    }
}

/// A cash-out the wallet has not accepted yet
///
/// `attempts` is zero for a cash-out that became known when a hand settled
/// and has not been tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingSettlement {
    player_id: PlayerId,
    final_stack: Chips,
    attempts: u32,
}

/// Table actor managing a single poker table
///
/// The actor is the only writer of its [`TableSession`]; messages are
/// applied one at a time in arrival order.
pub struct TableActor {
    /// Table ID
    id: TableId,

    /// Seats, stacks and the running hand
    session: TableSession,

    /// Message inbox
    inbox: mpsc::Receiver<TableMessage>,

    /// Wallet ledger for buy-ins/cash-outs
    wallet: Arc<WalletLedger>,

    /// Completed hand persistence
    recorder: HistoryRecorder,

    /// Cash-outs waiting for the wallet
    pending_settlements: Vec<PendingSettlement>,

    /// Stopped after a chip accounting failure
    halted: bool,

    /// Is table closed
    is_closed: bool,
}

impl TableActor {
    /// Create a new table actor
    ///
    /// # Arguments
    ///
    /// * `id` - Table ID
    /// * `config` - Table configuration
    /// * `deck_service` - Shuffling for every hand at this table
    /// * `wallet` - Wallet ledger reference
    /// * `recorder` - Completed hand persistence
    ///
    /// # Returns
    ///
    /// * `TableResult<(TableActor, TableHandle)>` - Actor and handle for sending messages
    pub fn new(
        id: TableId,
        config: TableConfig,
        deck_service: DeckService,
        wallet: Arc<WalletLedger>,
        recorder: HistoryRecorder,
    ) -> TableResult<(Self, TableHandle)> {
        let session = TableSession::new(id, config, deck_service)?;
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);

        let actor = Self {
            id,
            session,
            inbox,
            wallet,
            recorder,
            pending_settlements: Vec::new(),
            halted: false,
            is_closed: false,
        };

        Ok((actor, TableHandle::new(sender, id)))
    }

    /// Run the table actor event loop
    pub async fn run(mut self) {
        let config = self.session.config();
        log::info!("Table {} '{}' starting", self.id, config.name);

        let mut tick_interval = interval(Duration::from_millis(config.tick_interval_ms));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    match message {
                        Some(message) => self.handle_message(message).await,
                        None => break,
                    }
                    if self.is_closed {
                        break;
                    }
                }

                _ = tick_interval.tick() => {
                    self.tick().await;
                }
            }
        }

        if !self.pending_settlements.is_empty() {
            log::error!(
                "CRITICAL: Table {} stopped with {} unsettled cash-outs: {:?}",
                self.id,
                self.pending_settlements.len(),
                self.pending_settlements
            );
        }
        log::info!("Table {} '{}' closed", self.id, self.session.config().name);
    }

    /// Handle a table message
    async fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::Join {
                player_id,
                buy_in,
                seat,
                response,
            } => {
                let result = self.handle_join(player_id, buy_in, seat).await;
                let _ = response.send(result);
            }

            TableMessage::Leave {
                player_id,
                response,
            } => {
                let result = self.handle_leave(player_id).await;
                let _ = response.send(result);
            }

            TableMessage::TakeAction {
                player_id,
                action,
                response,
            } => {
                let result = self.handle_action(player_id, action);
                self.settle_finished_departures().await;
                let _ = response.send(result);
            }

            TableMessage::StartRound { response } => {
                let result = self.handle_start_round();
                self.settle_finished_departures().await;
                let _ = response.send(result);
            }

            TableMessage::GetState {
                player_id,
                response,
            } => {
                let _ = response.send(self.session.view_for(player_id));
            }

            TableMessage::GetSummary { response } => {
                let _ = response.send(self.summary());
            }

            TableMessage::Close { response } => {
                let report = self.handle_close().await;
                self.is_closed = true;
                let _ = response.send(report);
            }

            TableMessage::Tick => {
                self.tick().await;
            }
        }
    }

    fn summary(&self) -> TableSummary {
        TableSummary {
            halted: self.halted,
            ..self.session.summary()
        }
    }

    fn ensure_running(&self) -> TableResult<()> {
        if self.halted {
            return Err(TableError::Halted(self.id));
        }
        Ok(())
    }

    /// Stops all further mutation after a chip accounting failure.
    fn halt(&mut self, error: &TableError) {
        log::error!(
            "CRITICAL: Table {} halted on invariant violation: {}. Seated players: {:?}",
            self.id,
            error,
            self.session.seated_players()
        );
        telemetry::table_halted(self.id);
        self.halted = true;
    }

    /// Checks a session result for invariant violations before passing it on.
    fn guard<T>(&mut self, result: TableResult<T>) -> TableResult<T> {
        if let Err(e) = &result
            && e.is_invariant_violation()
        {
            self.halt(e);
        }
        self.flush_completed_hands();
        result
    }

    fn flush_completed_hands(&mut self) {
        for hand in self.session.drain_completed_hands() {
            telemetry::hand_completed(self.id, hand.pot, hand.rake);
            // The recorder logs its own failures.
            self.recorder.record(hand);
        }
        for departure in self.session.drain_settled_departures() {
            log::info!(
                "Table {}: player {} who left all-in finished with {}",
                self.id,
                departure.player_id,
                departure.final_stack
            );
            self.pending_settlements.push(PendingSettlement {
                player_id: departure.player_id,
                final_stack: departure.final_stack,
                attempts: 0,
            });
        }
    }

    /// Cash out players whose all-in hand has just settled.
    async fn settle_finished_departures(&mut self) {
        if self.pending_settlements.iter().any(|p| p.attempts == 0) {
            self.retry_settlements().await;
        }
    }

    /// Handle join table request
    async fn handle_join(
        &mut self,
        player_id: PlayerId,
        buy_in: Chips,
        seat: Option<SeatIndex>,
    ) -> EngineResult<SeatIndex> {
        self.ensure_running()?;
        let config = self.session.config();
        if self.session.is_seated(player_id) {
            return Err(TableError::PlayerAlreadySeated(player_id).into());
        }
        if !config.accepts_buy_in(buy_in) {
            return Err(TableError::InvalidBuyIn {
                amount: buy_in,
                min: config.min_buy_in_chips(),
                max: config.max_buy_in_chips(),
            }
            .into());
        }
        if self.session.is_full() {
            return Err(TableError::TableFull(self.id).into());
        }

        let reservation = self.wallet.reserve(player_id, self.id, buy_in).await?;

        match self.session.add_player(player_id, buy_in, seat) {
            Ok(seat) => {
                log::info!(
                    "Player {} joined table {} at seat {} with {} chips",
                    player_id,
                    self.id,
                    seat,
                    buy_in
                );
                Ok(seat)
            }
            Err(e) => {
                // Release the reservation untouched.
                match self.wallet.settle(player_id, self.id, buy_in).await {
                    Ok(_) => {
                        log::info!(
                            "Rolled back reservation {} for player {} on table {}",
                            reservation.id,
                            player_id,
                            self.id
                        );
                    }
                    Err(rollback_err) => {
                        log::error!(
                            "CRITICAL: Failed to roll back reservation {} for player {} on table {}: {}. Retrying on tick",
                            reservation.id,
                            player_id,
                            self.id,
                            rollback_err
                        );
                        self.defer_settlement(player_id, buy_in);
                    }
                }
                Err(e.into())
            }
        }
    }

    /// Handle leave table request
    async fn handle_leave(&mut self, player_id: PlayerId) -> EngineResult<LeaveOutcome> {
        self.ensure_running()?;
        let removed = self.session.remove_player(player_id);
        let departure = self.guard(removed)?;

        if departure.awaiting_showdown {
            log::info!(
                "Table {}: player {} left all-in; cash-out waits for the hand to settle",
                self.id,
                player_id
            );
            self.settle_finished_departures().await;
            return Ok(LeaveOutcome {
                final_stack: departure.final_stack,
                delta: None,
                awaiting_showdown: true,
            });
        }

        let delta = match self
            .wallet
            .settle(player_id, self.id, departure.final_stack)
            .await
        {
            Ok(delta) => Some(delta),
            Err(e) => {
                log::error!(
                    "Settlement of {} for player {} on table {} failed: {}. Retrying on tick",
                    departure.final_stack,
                    player_id,
                    self.id,
                    e
                );
                self.defer_settlement(player_id, departure.final_stack);
                None
            }
        };

        self.settle_finished_departures().await;
        Ok(LeaveOutcome {
            final_stack: departure.final_stack,
            delta,
            awaiting_showdown: false,
        })
    }

    fn defer_settlement(&mut self, player_id: PlayerId, final_stack: Chips) {
        telemetry::settlement_deferred(self.id);
        self.pending_settlements.push(PendingSettlement {
            player_id,
            final_stack,
            attempts: 1,
        });
    }

    /// Handle player action
    fn handle_action(&mut self, player_id: PlayerId, action: Action) -> ActionResult {
        if let Err(e) = self.ensure_running() {
            return ActionResult::rejected(EngineError::from(e).client_message());
        }
        let applied = self.session.apply_action(player_id, action);
        match self.guard(applied) {
            Ok(()) => ActionResult::accepted(self.session.view_for(Some(player_id))),
            Err(e) => {
                telemetry::action_rejected(self.id);
                log::debug!(
                    "Table {}: rejected {} from player {}: {}",
                    self.id,
                    action,
                    player_id,
                    e
                );
                ActionResult::rejected(EngineError::from(e).client_message())
            }
        }
    }

    fn handle_start_round(&mut self) -> EngineResult<Option<HandId>> {
        self.ensure_running()?;
        let started = self.session.start_round_if_ready();
        let hand_id = self.guard(started)?;
        if hand_id.is_some() {
            telemetry::hand_started(self.id);
        }
        Ok(hand_id)
    }

    /// Cash out every seated player.
    async fn handle_close(&mut self) -> CloseReport {
        let mut report = CloseReport::default();
        self.retry_settlements().await;

        if self.halted {
            report.unsettled.extend(
                self.pending_settlements
                    .drain(..)
                    .map(|p| (p.player_id, p.final_stack)),
            );
            // Stacks cannot be trusted; leave them for manual reconciliation.
            for player_id in self.session.seated_players() {
                let stack = self.session.stack_of(player_id).unwrap_or(0);
                report.unsettled.push((player_id, stack));
            }
            for player_id in self.session.awaiting_showdown() {
                report.unsettled.push((player_id, 0));
            }
            return report;
        }

        for player_id in self.session.seated_players() {
            let removed = self.session.remove_player(player_id);
            let departure = match self.guard(removed) {
                Ok(departure) => departure,
                Err(e) => {
                    log::error!("Table {}: could not remove player {}: {}", self.id, player_id, e);
                    let stack = self.session.stack_of(player_id).unwrap_or(0);
                    report.unsettled.push((player_id, stack));
                    continue;
                }
            };
            if departure.awaiting_showdown {
                continue;
            }
            match self
                .wallet
                .settle(player_id, self.id, departure.final_stack)
                .await
            {
                Ok(_) => report.settled.push((player_id, departure.final_stack)),
                Err(e) => {
                    log::error!(
                        "CRITICAL: Table {} closing without settling player {} ({} chips): {}",
                        self.id,
                        player_id,
                        departure.final_stack,
                        e
                    );
                    report.unsettled.push((player_id, departure.final_stack));
                }
            }
        }

        // Players who left all-in are paid once the last departure ends the hand.
        let settled = self.retry_settlements().await;
        report.settled.extend(settled);
        report.unsettled.extend(
            self.pending_settlements
                .drain(..)
                .map(|p| (p.player_id, p.final_stack)),
        );
        for player_id in self.session.awaiting_showdown() {
            report.unsettled.push((player_id, 0));
        }
        report
    }

    /// Returns the cash-outs the wallet accepted.
    async fn retry_settlements(&mut self) -> Vec<(PlayerId, Chips)> {
        let mut settled = Vec::new();
        let pending = std::mem::take(&mut self.pending_settlements);
        for mut settlement in pending {
            match self
                .wallet
                .settle(settlement.player_id, self.id, settlement.final_stack)
                .await
            {
                Ok(delta) => {
                    log::info!(
                        "Deferred settlement for player {} on table {} applied (net {})",
                        settlement.player_id,
                        self.id,
                        delta
                    );
                    settled.push((settlement.player_id, settlement.final_stack));
                }
                Err(WalletError::NoActiveReservation { .. }) => {
                    log::warn!(
                        "Deferred settlement for player {} on table {} found no active reservation",
                        settlement.player_id,
                        self.id
                    );
                }
                Err(e) => {
                    if settlement.attempts == 0 {
                        telemetry::settlement_deferred(self.id);
                    }
                    settlement.attempts += 1;
                    log::warn!(
                        "Deferred settlement for player {} on table {} failed again (attempt {}): {}",
                        settlement.player_id,
                        self.id,
                        settlement.attempts,
                        e
                    );
                    self.pending_settlements.push(settlement);
                }
            }
        }
        settled
    }

    /// Periodic housekeeping
    async fn tick(&mut self) {
        self.retry_settlements().await;
        if self.halted || !self.session.config().auto_start {
            return;
        }
        if let Err(e) = self.handle_start_round() {
            log::warn!("Table {}: automatic hand start failed: {}", self.id, e);
        }
    }
}
