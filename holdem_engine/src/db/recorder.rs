//! Asynchronous persistence of completed hands.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::task::JoinSet;

use super::repository::HandHistoryRepository;
use crate::game::CompletedHand;

/// Default number of save attempts per hand
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Delay before the first retry; doubles on every attempt
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(100);

/// Outcome of the saves awaited by [`HistoryRecorder::flush`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub saved: usize,
    pub failed: usize,
}

/// Saves completed hands off the table's critical path.
///
/// A failed save is retried with exponential backoff. When every attempt
/// fails the hand is logged and dropped; the table never waits for it.
/// Saves in flight are tracked so the host can [`flush`](Self::flush) them
/// before closing storage.
#[derive(Clone)]
pub struct HistoryRecorder {
    repository: Arc<dyn HandHistoryRepository>,
    max_attempts: u32,
    base_backoff: Duration,
    in_flight: Arc<Mutex<JoinSet<bool>>>,
}

impl HistoryRecorder {
    pub fn new(repository: Arc<dyn HandHistoryRepository>) -> Self {
        Self {
            repository,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
            in_flight: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    pub fn with_retry(mut self, max_attempts: u32, base_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.base_backoff = base_backoff;
        self
    }

    pub fn repository(&self) -> &Arc<dyn HandHistoryRepository> {
        &self.repository
    }

    /// Spawns the save and keeps track of it until [`Self::flush`].
    pub fn record(&self, hand: CompletedHand) {
        let recorder = self.clone();
        let Ok(mut in_flight) = self.in_flight.lock() else {
            log::error!(
                "Save tracking unavailable; saving hand {} untracked",
                hand.hand_id
            );
            tokio::spawn(async move { recorder.save_with_retry(&hand).await });
            return;
        };
        // Reap saves that already finished.
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn(async move { recorder.save_with_retry(&hand).await });
    }

    /// Number of saves not yet reaped.
    pub fn pending(&self) -> usize {
        self.in_flight.lock().map_or(0, |set| set.len())
    }

    /// Waits for every save spawned so far, retries included.
    pub async fn flush(&self) -> FlushSummary {
        let mut in_flight = match self.in_flight.lock() {
            Ok(mut set) => std::mem::take(&mut *set),
            Err(_) => return FlushSummary::default(),
        };
        let mut summary = FlushSummary::default();
        while let Some(result) = in_flight.join_next().await {
            match result {
                Ok(true) => summary.saved += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    log::error!("Hand save task failed: {}", e);
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    async fn save_with_retry(&self, hand: &CompletedHand) -> bool {
        let mut backoff = self.base_backoff;
        for attempt in 1..=self.max_attempts {
            match self.repository.save_completed_hand(hand).await {
                Ok(()) => {
                    log::debug!("Saved hand {} for table {}", hand.hand_id, hand.table_id);
                    return true;
                }
                Err(e) if attempt < self.max_attempts => {
                    log::warn!(
                        "Saving hand {} failed (attempt {}/{}): {}",
                        hand.hand_id,
                        attempt,
                        self.max_attempts,
                        e
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(e) => {
                    log::error!(
                        "Giving up on hand {} for table {} after {} attempts: {}",
                        hand.hand_id,
                        hand.table_id,
                        self.max_attempts,
                        e
                    );
                    crate::telemetry::history_save_failed();
                }
            }
        }
        false
    }
}
