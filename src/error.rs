//! Error taxonomy for the watchdog core.
//!
//! Nothing in here is fatal to the process. Poll failures are absorbed by the
//! feed going offline until the next tick; escalation failures are reported
//! once to whoever pressed the trigger.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum WatchdogError {
    /// Liveness probe or feed fetch failed. The feed is marked offline and
    /// the next scheduled poll is the retry.
    #[error("scoring service unreachable during {operation}: {reason}")]
    Connectivity {
        operation: &'static str,
        reason: String,
    },

    /// The retrain trigger failed, whether at the transport, the HTTP status,
    /// or inside a 200 body that reports an error.
    #[error("adaptation trigger failed: {reason}")]
    Escalation { reason: String },

    /// An adaptation was requested while a previous one is still pending.
    #[error("adaptation request {id} is still in flight")]
    EscalationInFlight { id: Uuid },

    /// A fetched record is missing required fields or violates a range
    /// check. Only the record is dropped, never the snapshot around it.
    #[error("malformed record {id}: {reason}")]
    MalformedRecord { id: String, reason: String },
}
