//! Feed synchronization: shared state, snapshot reconciliation, derived
//! stats, and the scheduled poll loop that drives them.

pub mod poller;
pub mod reconciler;
pub mod state;
pub mod stats;


pub use poller::{FeedPoller, PollerHandle};
pub use reconciler::{reconcile, ReconcileOutcome};
pub use state::{FeedHandle, PollHealth};
pub use stats::aggregate;
