//! Fraud Watchdog client library.
//!
//! Keeps a local, stable view of a remote transaction-scoring feed, derives
//! summary stats from it, and sequences operator-triggered retraining
//! against the service. Exposed as a library for the `watchdog` binary and
//! the integration tests.

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod escalation;
pub mod feed;
pub mod models;

pub use classify::{classify, PresentationState};
pub use client::ScoringServiceClient;
pub use config::WatchdogConfig;
pub use error::WatchdogError;
pub use escalation::{EscalationController, EscalationOutcome, EscalationRecord};
pub use feed::{FeedHandle, FeedPoller, PollerHandle};
pub use models::{ClassificationRecord, Connectivity, FeedStats, Prediction, ReviewStatus};
