//! Snapshot reconciliation.
//!
//! The service returns its complete history on every poll, array in arrival
//! order (oldest first). That array order is the single ordering rule: the
//! local feed is the same sequence reversed, newest first. Each snapshot
//! replaces the record set wholesale, which keeps identical re-fetches
//! stable and appends flicker-free without merging anything per record.
//! A delta-serving protocol would need explicit dedup by id here; the
//! full-history contract makes that unnecessary.

use chrono::Utc;

use crate::models::{ClassificationRecord, Connectivity, FeedStats};

use super::state::FeedHandle;
use super::stats;

/// What one reconciliation pass changed.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub stats: FeedStats,
    /// Records seen for the first time this cycle, newest first.
    pub appended: Vec<ClassificationRecord>,
    /// First successful cycle since startup; `appended` is the backlog.
    pub initial: bool,
    /// The snapshot was not a pure append on the previous one. The service
    /// restarted or rewrote history; its view still wins.
    pub refreshed: bool,
}

/// Fold a fetched snapshot into the feed. Records, stats, connectivity, and
/// poll bookkeeping are swapped under one write lock, so observers never see
/// a half-applied cycle.
pub fn reconcile(
    feed: &FeedHandle,
    snapshot: Vec<ClassificationRecord>,
    max_records: Option<usize>,
) -> ReconcileOutcome {
    let mut display = snapshot;
    display.reverse();

    let mut state = feed.inner.write();

    let initial = state.last_success_at.is_none();
    let prev_head = state.records.first().map(|r| r.id.clone());

    let (appended, refreshed) = match prev_head {
        None => (display.clone(), false),
        Some(head) => match display.iter().position(|r| r.id == head) {
            Some(pos) => (display[..pos].to_vec(), false),
            None => (display.clone(), true),
        },
    };

    if let Some(cap) = max_records {
        display.truncate(cap);
    }

    let stats = stats::aggregate(&display);
    let now = Utc::now();

    state.records = display;
    state.stats = stats;
    state.connectivity = Connectivity::Online;
    state.last_poll_at = Some(now);
    state.last_success_at = Some(now);
    state.consecutive_failures = 0;
    state.cycles_completed += 1;

    ReconcileOutcome {
        stats,
        appended,
        initial,
        refreshed,
    }
}
