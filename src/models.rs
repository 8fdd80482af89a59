//! Wire and domain types shared across the watchdog.
//!
//! The scoring service speaks SCREAMING_SNAKE JSON and has drifted across
//! deployments (`LEGIT` vs `LEGITIMATE`, `HIGH_CONFIDENCE` vs `NORMAL`,
//! numeric vs string timestamps), so the serde derives here carry aliases
//! and a tolerant timestamp deserializer instead of assuming one vintage.

use serde::{Deserialize, Serialize};

use crate::error::WatchdogError;

/// Model verdict on a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prediction {
    #[serde(rename = "FRAUD")]
    Fraud,
    #[serde(rename = "LEGITIMATE", alias = "LEGIT")]
    Legitimate,
}

/// Confidence band attached by the scoring pipeline. Older deployments call
/// the field `mlops_status` on the wire, so that name is kept for I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewStatus {
    #[serde(rename = "NORMAL", alias = "HIGH_CONFIDENCE")]
    Normal,
    #[serde(rename = "UNCERTAIN_GREY_ZONE")]
    UncertainGreyZone,
}

/// One scored transaction as served by the live feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub id: String,
    pub prediction: Prediction,
    pub confidence_score: f64,
    #[serde(rename = "mlops_status")]
    pub review_status: ReviewStatus,
    pub amount: f64,
    /// Display-only. The service has emitted both `"14:03:22"` strings and
    /// epoch numbers here, so whatever arrives is kept verbatim as text.
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    pub timestamp: String,
}

impl ClassificationRecord {
    /// Parse a single feed element, enforcing the range checks the service
    /// itself has been known to violate.
    pub fn from_value(value: serde_json::Value) -> Result<Self, WatchdogError> {
        let id = value
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("<unknown>")
            .to_string();
        let record: Self = serde_json::from_value(value).map_err(|e| {
            WatchdogError::MalformedRecord {
                id: id.clone(),
                reason: e.to_string(),
            }
        })?;
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<(), WatchdogError> {
        if self.id.trim().is_empty() {
            return Err(WatchdogError::MalformedRecord {
                id: "<unknown>".to_string(),
                reason: "empty id".to_string(),
            });
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(WatchdogError::MalformedRecord {
                id: self.id.clone(),
                reason: format!("amount {} out of range", self.amount),
            });
        }
        if !self.confidence_score.is_finite() || !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(WatchdogError::MalformedRecord {
                id: self.id.clone(),
                reason: format!("confidence_score {} outside [0, 1]", self.confidence_score),
            });
        }
        Ok(())
    }
}

/// Parse a raw feed snapshot element by element. Bad records come back as
/// errors for the caller to log; the good ones keep their wire order.
pub fn parse_records(
    values: Vec<serde_json::Value>,
) -> (Vec<ClassificationRecord>, Vec<WatchdogError>) {
    let mut records = Vec::with_capacity(values.len());
    let mut dropped = Vec::new();
    for value in values {
        match ClassificationRecord::from_value(value) {
            Ok(record) => records.push(record),
            Err(err) => dropped.push(err),
        }
    }
    (records, dropped)
}

/// Summary counts derived from the full record set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedStats {
    pub total: usize,
    pub fraud_count: usize,
    pub uncertain_count: usize,
}

/// Whether the local feed currently trusts its view of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Connectivity {
    /// No poll cycle has settled yet.
    Connecting,
    Online,
    Offline,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::Connecting
    }
}

fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(f64),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => Ok(s),
        StringOrNumber::Number(n) => Ok(n.to_string()),
    }
}
