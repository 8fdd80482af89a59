//! Human-in-the-loop escalation into the retraining workflow.
//!
//! One adaptation request may be in flight per process. The pending slot is
//! the state machine: `None` is idle, `Some` is pending, and every exit path
//! returns the slot to `None`. The claim check happens under a single lock
//! acquisition with no await inside, so two concurrent callers can never
//! both win the slot.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::ScoringServiceClient;
use crate::error::WatchdogError;
use crate::feed::FeedHandle;

/// One in-flight retrain trigger.
#[derive(Debug, Clone)]
pub struct EscalationRequest {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Grey-zone record whose review prompted the trigger, if any. Audit
    /// note only; the service call does not carry it.
    pub source_record: Option<String>,
}

impl EscalationRequest {
    fn new(source_record: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            source_record,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationOutcome {
    Succeeded,
    Failed,
}

/// A completed attempt, kept in the bounded in-memory history.
#[derive(Debug, Clone, Serialize)]
pub struct EscalationRecord {
    pub id: Uuid,
    pub requested_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: EscalationOutcome,
    pub detail: String,
    pub source_record: Option<String>,
}

pub struct EscalationController {
    client: ScoringServiceClient,
    feed: FeedHandle,
    pending: Mutex<Option<EscalationRequest>>,
    history: Mutex<VecDeque<EscalationRecord>>,
    history_cap: usize,
}

impl EscalationController {
    pub fn new(client: ScoringServiceClient, feed: FeedHandle, history_cap: usize) -> Self {
        Self {
            client,
            feed,
            pending: Mutex::new(None),
            history: Mutex::new(VecDeque::new()),
            history_cap,
        }
    }

    /// True while a trigger is pending. Callers use this to grey out the
    /// trigger control.
    pub fn is_syncing(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// The pending request, if one is in flight.
    pub fn pending_request(&self) -> Option<EscalationRequest> {
        self.pending.lock().clone()
    }

    /// Completed attempts, most recent first, at most `limit`.
    pub fn history(&self, limit: usize) -> Vec<EscalationRecord> {
        self.history
            .lock()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Fire the retraining trigger once.
    ///
    /// Returns `EscalationInFlight` without touching the wire if a request
    /// is already pending. On completion the outcome lands in the history
    /// and, when the acknowledgement carries stats, on the shared feed.
    pub async fn trigger_adaptation(
        &self,
        source_record: Option<String>,
    ) -> Result<EscalationRecord, WatchdogError> {
        let request = {
            let mut slot = self.pending.lock();
            if let Some(pending) = slot.as_ref() {
                warn!(
                    "🚦 Adaptation rejected: request {} is still in flight",
                    pending.id
                );
                return Err(WatchdogError::EscalationInFlight { id: pending.id });
            }
            let request = EscalationRequest::new(source_record);
            *slot = Some(request.clone());
            request
        };

        // Clears the slot on every way out of this function, including a
        // caller dropping the future mid-await.
        let _clear = ClearGuard {
            slot: &self.pending,
        };

        match &request.source_record {
            Some(id) => info!(
                "🔁 Adaptation triggered by record {} (request {})",
                id, request.id
            ),
            None => info!("🔁 Adaptation triggered (request {})", request.id),
        }

        let result = self.client.trigger_retrain().await;
        let finished_at = Utc::now();

        match result {
            Ok(ack) => {
                if let Some(stats) = ack.stats {
                    self.feed.overwrite_stats(stats);
                }
                let detail = ack
                    .message
                    .or(ack.status)
                    .unwrap_or_else(|| "acknowledged".to_string());
                info!("✅ Adaptation request {} acknowledged: {}", request.id, detail);

                let record = EscalationRecord {
                    id: request.id,
                    requested_at: request.started_at,
                    finished_at,
                    outcome: EscalationOutcome::Succeeded,
                    detail,
                    source_record: request.source_record,
                };
                self.push_history(record.clone());
                Ok(record)
            }
            Err(err) => {
                warn!("❌ Adaptation request {} failed: {}", request.id, err);
                self.push_history(EscalationRecord {
                    id: request.id,
                    requested_at: request.started_at,
                    finished_at,
                    outcome: EscalationOutcome::Failed,
                    detail: err.to_string(),
                    source_record: request.source_record,
                });
                Err(err)
            }
        }
    }

    fn push_history(&self, record: EscalationRecord) {
        let mut history = self.history.lock();
        history.push_back(record);
        while history.len() > self.history_cap {
            history.pop_front();
        }
    }
}

/// Returns the pending slot to idle when dropped, whatever the exit path.
struct ClearGuard<'a> {
    slot: &'a Mutex<Option<EscalationRequest>>,
}

impl Drop for ClearGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock() = None;
    }
}
