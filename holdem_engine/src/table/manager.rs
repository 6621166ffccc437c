//! Table manager for spawning and managing multiple table actors.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

use super::{
    actor::{TableActor, TableHandle},
    config::TableConfig,
    errors::TableError,
    messages::{CloseReport, LeaveOutcome, TableMessage},
    registry::TableRegistry,
    view::{ActionResult, GameState, TableSummary},
};
use crate::{
    db::{FlushSummary, HistoryRecorder},
    errors::EngineResult,
    game::{
        deck::DeckService,
        entities::{Action, Chips, HandId, PlayerId, SeatIndex, TableId},
    },
    telemetry,
    wallet::WalletLedger,
};

/// Table manager for managing multiple table instances
///
/// Routes requests to the actor owning each table. Tables share nothing but
/// the wallet ledger and the history recorder.
pub struct TableManager {
    /// Wallet ledger shared by every table
    wallet: Arc<WalletLedger>,

    /// Completed hand persistence
    recorder: HistoryRecorder,

    /// Table placement
    registry: Arc<dyn TableRegistry>,

    /// Shuffling handed to each new table
    deck_service: DeckService,

    /// Active table handles
    tables: Arc<RwLock<HashMap<TableId, TableHandle>>>,

    /// Next table ID
    next_table_id: Arc<RwLock<TableId>>,
}

impl TableManager {
    /// Create a new table manager
    ///
    /// # Arguments
    ///
    /// * `wallet` - Wallet ledger
    /// * `recorder` - Completed hand persistence
    /// * `registry` - Table placement
    /// * `deck_service` - Shuffling for new tables
    pub fn new(
        wallet: Arc<WalletLedger>,
        recorder: HistoryRecorder,
        registry: Arc<dyn TableRegistry>,
        deck_service: DeckService,
    ) -> Self {
        Self {
            wallet,
            recorder,
            registry,
            deck_service,
            tables: Arc::new(RwLock::new(HashMap::new())),
            next_table_id: Arc::new(RwLock::new(1)),
        }
    }

    pub fn wallet(&self) -> &Arc<WalletLedger> {
        &self.wallet
    }

    /// Create and spawn a new table
    ///
    /// # Returns
    ///
    /// * `EngineResult<TableId>` - Table ID or error
    ///
    /// # Errors
    ///
    /// * `TableError::InvalidConfig` - The configuration does not validate
    /// * `RegistryError` - The table could not be claimed for this node
    pub async fn create_table(&self, config: TableConfig) -> EngineResult<TableId> {
        config.validate().map_err(TableError::InvalidConfig)?;

        let mut next_id = self.next_table_id.write().await;
        let table_id = *next_id;
        *next_id += 1;
        drop(next_id);

        let node = self.registry.assign(table_id).await?;
        let name = config.name.clone();
        let (actor, handle) = match TableActor::new(
            table_id,
            config,
            self.deck_service.clone(),
            self.wallet.clone(),
            self.recorder.clone(),
        ) {
            Ok(created) => created,
            Err(e) => {
                if let Err(release_err) = self.registry.release(table_id).await {
                    log::warn!("Failed to release table {}: {}", table_id, release_err);
                }
                return Err(e.into());
            }
        };

        let mut tables = self.tables.write().await;
        tables.insert(table_id, handle);
        telemetry::active_tables(tables.len());
        drop(tables);

        tokio::spawn(actor.run());
        log::info!("Created table {} '{}' on {}", table_id, name, node);
        Ok(table_id)
    }

    /// Cash out every player, stop the table's actor and release it
    pub async fn close_table(&self, table_id: TableId) -> EngineResult<CloseReport> {
        let handle = self
            .tables
            .write()
            .await
            .remove(&table_id)
            .ok_or(TableError::TableNotFound(table_id))?;
        telemetry::active_tables(self.tables.read().await.len());

        let report = handle
            .request(|response| TableMessage::Close { response })
            .await?;
        if let Err(e) = self.registry.release(table_id).await {
            log::warn!("Failed to release table {}: {}", table_id, e);
        }
        if !report.is_clean() {
            log::error!(
                "CRITICAL: Table {} closed with unsettled players: {:?}",
                table_id,
                report.unsettled
            );
        }
        log::info!("Closed table {}", table_id);
        Ok(report)
    }

    /// Wait for completed hands still being saved.
    ///
    /// Closing a table can finish its running hand, so call this after
    /// [`Self::shutdown`] and before the history store goes away.
    pub async fn flush_history(&self) -> FlushSummary {
        let summary = self.recorder.flush().await;
        if summary.failed > 0 {
            log::error!("{} completed hands could not be saved", summary.failed);
        }
        summary
    }

    /// Close every table
    pub async fn shutdown(&self) -> Vec<(TableId, EngineResult<CloseReport>)> {
        let ids: Vec<TableId> = self.tables.read().await.keys().copied().collect();
        let mut reports = Vec::with_capacity(ids.len());
        for table_id in ids {
            reports.push((table_id, self.close_table(table_id).await));
        }
        reports
    }

    /// List all active tables, ordered by ID
    pub async fn list_tables(&self) -> Vec<TableSummary> {
        let handles: Vec<TableHandle> = self.tables.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle
                .request(|response| TableMessage::GetSummary { response })
                .await
            {
                Ok(summary) => summaries.push(summary),
                Err(e) => log::warn!("Table {} did not report: {}", handle.table_id(), e),
            }
        }
        summaries.sort_by_key(|s| s.table_id);
        summaries
    }

    /// Get table handle
    pub async fn get_table(&self, table_id: TableId) -> EngineResult<TableHandle> {
        self.tables
            .read()
            .await
            .get(&table_id)
            .cloned()
            .ok_or_else(|| TableError::TableNotFound(table_id).into())
    }

    /// Start a hand at the table if it is ready
    pub async fn start_round_if_ready(&self, table_id: TableId) -> EngineResult<Option<HandId>> {
        let handle = self.get_table(table_id).await?;
        handle
            .request(|response| TableMessage::StartRound { response })
            .await?
    }

    /// Submit a player's action
    ///
    /// Illegal actions are reported in the returned `ActionResult`; the error
    /// path is for unknown or closed tables.
    pub async fn process_player_action(
        &self,
        table_id: TableId,
        player_id: PlayerId,
        action: Action,
    ) -> EngineResult<ActionResult> {
        let handle = self.get_table(table_id).await?;
        handle
            .request(|response| TableMessage::TakeAction {
                player_id,
                action,
                response,
            })
            .await
    }

    /// Table state as seen by `player_id`, or by a spectator
    pub async fn get_current_state(
        &self,
        table_id: TableId,
        player_id: Option<PlayerId>,
    ) -> EngineResult<GameState> {
        let handle = self.get_table(table_id).await?;
        handle
            .request(|response| TableMessage::GetState {
                player_id,
                response,
            })
            .await
    }

    /// Reserve `buy_in` from the player's wallet and seat them
    pub async fn add_player(
        &self,
        table_id: TableId,
        player_id: PlayerId,
        buy_in: Chips,
    ) -> EngineResult<SeatIndex> {
        self.add_player_at(table_id, player_id, buy_in, None).await
    }

    /// Like [`Self::add_player`] with a requested seat
    pub async fn add_player_at(
        &self,
        table_id: TableId,
        player_id: PlayerId,
        buy_in: Chips,
        seat: Option<SeatIndex>,
    ) -> EngineResult<SeatIndex> {
        let handle = self.get_table(table_id).await?;
        handle
            .request(|response| TableMessage::Join {
                player_id,
                buy_in,
                seat,
                response,
            })
            .await?
    }

    /// Unseat the player and settle their reservation
    ///
    /// # Returns
    ///
    /// * `EngineResult<Chips>` - The stack the player left with
    pub async fn remove_player(&self, table_id: TableId, player_id: PlayerId) -> EngineResult<Chips> {
        Ok(self.leave_table(table_id, player_id).await?.final_stack)
    }

    /// Like [`Self::remove_player`], also reporting the wallet delta
    pub async fn leave_table(
        &self,
        table_id: TableId,
        player_id: PlayerId,
    ) -> EngineResult<LeaveOutcome> {
        let handle = self.get_table(table_id).await?;
        handle
            .request(|response| TableMessage::Leave {
                player_id,
                response,
            })
            .await?
    }
}
