//! Derived feed statistics.

use crate::models::{ClassificationRecord, FeedStats, Prediction, ReviewStatus};

/// Recompute summary counts from the full record set. No incremental
/// counters are carried between polls, so re-running over the same records
/// always lands on the same numbers.
pub fn aggregate(records: &[ClassificationRecord]) -> FeedStats {
    let mut stats = FeedStats {
        total: records.len(),
        ..FeedStats::default()
    };
    for record in records {
        if record.prediction == Prediction::Fraud {
            stats.fraud_count += 1;
        }
        if record.review_status == ReviewStatus::UncertainGreyZone {
            stats.uncertain_count += 1;
        }
    }
    stats
}
