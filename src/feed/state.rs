//! Canonical client-side view of the classification feed.
//!
//! The poll loop, the escalation controller, and any observer share one
//! `FeedHandle`. Writers hold the lock across a whole reconcile pass, so a
//! cycle's records, stats, and connectivity become visible together rather
//! than one field at a time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::models::{ClassificationRecord, Connectivity, FeedStats};

/// Poll bookkeeping surfaced alongside the feed itself.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PollHealth {
    pub connectivity: Connectivity,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub cycles_completed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct FeedState {
    /// Newest first. Only the reconciler replaces this.
    pub(crate) records: Vec<ClassificationRecord>,
    pub(crate) connectivity: Connectivity,
    pub(crate) stats: FeedStats,
    pub(crate) last_poll_at: Option<DateTime<Utc>>,
    pub(crate) last_success_at: Option<DateTime<Utc>>,
    pub(crate) consecutive_failures: u32,
    pub(crate) cycles_completed: u64,
}

/// Cloneable handle to the shared feed state.
#[derive(Debug, Clone, Default)]
pub struct FeedHandle {
    pub(crate) inner: Arc<RwLock<FeedState>>,
}

impl FeedHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connectivity(&self) -> Connectivity {
        self.inner.read().connectivity
    }

    pub fn stats(&self) -> FeedStats {
        self.inner.read().stats
    }

    /// Current records, newest first.
    pub fn records(&self) -> Vec<ClassificationRecord> {
        self.inner.read().records.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    pub fn health(&self) -> PollHealth {
        let state = self.inner.read();
        PollHealth {
            connectivity: state.connectivity,
            last_poll_at: state.last_poll_at,
            last_success_at: state.last_success_at,
            consecutive_failures: state.consecutive_failures,
            cycles_completed: state.cycles_completed,
        }
    }

    /// Failure path for a poll cycle. The feed goes offline and keeps its
    /// last good records and stats untouched. Returns the failure streak.
    pub(crate) fn mark_offline(&self) -> u32 {
        let mut state = self.inner.write();
        state.connectivity = Connectivity::Offline;
        state.last_poll_at = Some(Utc::now());
        state.consecutive_failures += 1;
        state.cycles_completed += 1;
        state.consecutive_failures
    }

    /// Push service-computed stats, as returned by a retrain acknowledgement.
    /// The next successful poll recomputes them from the record set.
    pub(crate) fn overwrite_stats(&self, stats: FeedStats) {
        self.inner.write().stats = stats;
    }
}
