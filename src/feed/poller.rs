//! Scheduled polling of the scoring service.
//!
//! One cycle = liveness probe + full-feed fetch + reconcile. The loop awaits
//! each cycle to completion before arming the next tick, so cycles never
//! overlap; a slow service stretches the schedule instead of stacking
//! requests. Either request failing marks the feed offline for that cycle
//! and the next tick is the retry.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::classify::{classify, PresentationState};
use crate::client::ScoringServiceClient;
use crate::error::WatchdogError;
use crate::models::{ClassificationRecord, Connectivity};

use super::reconciler;
use super::state::FeedHandle;

pub struct FeedPoller {
    client: ScoringServiceClient,
    feed: FeedHandle,
    poll_interval: Duration,
    max_records: Option<usize>,
}

/// Control handle for a spawned poll loop.
pub struct PollerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Ask the loop to stop. An in-flight cycle is dropped mid-request and
    /// its result never reaches the feed.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Stop and wait for the loop task to exit.
    pub async fn shutdown(self) {
        self.stop();
        let _ = self.task.await;
    }
}

impl FeedPoller {
    pub fn new(
        client: ScoringServiceClient,
        feed: FeedHandle,
        poll_interval: Duration,
        max_records: Option<usize>,
    ) -> Self {
        Self {
            client,
            feed,
            poll_interval,
            max_records,
        }
    }

    /// Spawn the poll loop onto the runtime and return its control handle.
    pub fn spawn(self) -> PollerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });
        PollerHandle { shutdown_tx, task }
    }

    async fn run(self, shutdown_rx: &mut watch::Receiver<bool>) {
        info!(
            "📡 Poll loop started (interval {}ms)",
            self.poll_interval.as_millis()
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = self.run_cycle() => {}
            }
        }

        info!("🛑 Poll loop stopped");
    }

    async fn run_cycle(&self) {
        let was_offline = self.feed.connectivity() == Connectivity::Offline;

        match self.poll_once().await {
            Ok(snapshot) => {
                let outcome =
                    reconciler::reconcile(&self.feed, snapshot, self.max_records);

                if was_offline {
                    info!("✅ Scoring service back online");
                }
                if outcome.initial {
                    info!(
                        "📦 Initial snapshot: {} records ({} fraud, {} grey zone)",
                        outcome.stats.total,
                        outcome.stats.fraud_count,
                        outcome.stats.uncertain_count
                    );
                } else if outcome.refreshed {
                    warn!(
                        "🔄 Service replaced its history; feed refreshed to {} records",
                        outcome.stats.total
                    );
                } else {
                    // Oldest of the new arrivals first, so the console reads
                    // in arrival order.
                    for record in outcome.appended.iter().rev() {
                        log_new_record(record);
                    }
                }
            }
            Err(err) => {
                let failures = self.feed.mark_offline();
                warn!("⚠️ Poll cycle failed ({} consecutive): {}", failures, err);
            }
        }
    }

    /// Probe first, fetch second. Both must succeed for the cycle to apply.
    async fn poll_once(&self) -> Result<Vec<ClassificationRecord>, WatchdogError> {
        self.client.liveness().await?;
        self.client.fetch_snapshot().await
    }
}

fn log_new_record(record: &ClassificationRecord) {
    match classify(record) {
        PresentationState::Fraud => warn!(
            "🚫 FRAUD {} | ${:.2} | confidence {:.2}",
            record.id, record.amount, record.confidence_score
        ),
        PresentationState::Review => warn!(
            "⚠️ REVIEW {} | ${:.2} | confidence {:.2} (grey zone)",
            record.id, record.amount, record.confidence_score
        ),
        PresentationState::Normal => info!(
            "✅ ALLOWED {} | ${:.2} | confidence {:.2}",
            record.id, record.amount, record.confidence_score
        ),
    }
}
