//! Presentation-state mapping for scored records.

use serde::Serialize;

use crate::models::{ClassificationRecord, Prediction, ReviewStatus};

/// How a record is surfaced to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresentationState {
    Fraud,
    Review,
    Normal,
}

impl PresentationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresentationState::Fraud => "FRAUD",
            PresentationState::Review => "REVIEW",
            PresentationState::Normal => "NORMAL",
        }
    }
}

/// Map a record to its presentation state. An outright fraud verdict outranks
/// the grey-zone flag when both are present, so a record never lands in two
/// buckets at once.
pub fn classify(record: &ClassificationRecord) -> PresentationState {
    if record.prediction == Prediction::Fraud {
        return PresentationState::Fraud;
    }
    if record.review_status == ReviewStatus::UncertainGreyZone {
        return PresentationState::Review;
    }
    PresentationState::Normal
}
