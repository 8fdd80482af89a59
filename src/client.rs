//! HTTP client for the remote scoring service.
//!
//! Three endpoints: a liveness probe at `/`, the full-history feed, and the
//! retrain trigger. Transport timeouts come from the client builder, so a
//! hung service turns into a connectivity error instead of a stuck poll.

use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::WatchdogConfig;
use crate::error::WatchdogError;
use crate::models::{self, ClassificationRecord, FeedStats};

#[derive(Debug, Clone)]
pub struct ScoringServiceClient {
    client: reqwest::Client,
    base_url: String,
    feed_path: String,
    retrain_path: String,
}

/// Body of a successful retrain trigger. Deployments disagree on the exact
/// shape, so every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetrainAck {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Some deployments return service-side stats with the acknowledgement.
    #[serde(default)]
    pub stats: Option<FeedStats>,
}

impl RetrainAck {
    /// Deployments that always answer 200 report failures inside the body.
    fn reports_error(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("error"))
            .unwrap_or(false)
    }
}

impl ScoringServiceClient {
    pub fn new(config: &WatchdogConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            feed_path: config.feed_path.clone(),
            retrain_path: config.retrain_path.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Probe the service root. Any success status counts as awake.
    pub async fn liveness(&self) -> Result<(), WatchdogError> {
        let resp = self
            .client
            .get(self.url("/"))
            .send()
            .await
            .map_err(|e| WatchdogError::Connectivity {
                operation: "liveness probe",
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(WatchdogError::Connectivity {
                operation: "liveness probe",
                reason: format!("status {}", resp.status()),
            });
        }
        Ok(())
    }

    /// Fetch the full classification history, oldest first as the service
    /// serves it. Malformed elements are dropped one by one; a single bad
    /// record never costs the rest of the snapshot.
    pub async fn fetch_snapshot(&self) -> Result<Vec<ClassificationRecord>, WatchdogError> {
        let resp = self
            .client
            .get(self.url(&self.feed_path))
            .send()
            .await
            .map_err(|e| WatchdogError::Connectivity {
                operation: "feed fetch",
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(WatchdogError::Connectivity {
                operation: "feed fetch",
                reason: format!("status {}", resp.status()),
            });
        }

        let values: Vec<serde_json::Value> =
            resp.json().await.map_err(|e| WatchdogError::Connectivity {
                operation: "feed fetch",
                reason: format!("invalid feed body: {}", e),
            })?;

        let (records, dropped) = models::parse_records(values);
        for err in &dropped {
            warn!("🧹 Dropped feed element: {}", err);
        }
        debug!(
            "📥 Feed snapshot: {} records ({} dropped)",
            records.len(),
            dropped.len()
        );
        Ok(records)
    }

    /// Fire the retraining trigger. A success status whose body reports an
    /// error still comes back as a failure.
    pub async fn trigger_retrain(&self) -> Result<RetrainAck, WatchdogError> {
        let resp = self
            .client
            .post(self.url(&self.retrain_path))
            .send()
            .await
            .map_err(|e| WatchdogError::Escalation {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(WatchdogError::Escalation {
                reason: format!("status {}: {}", status, text),
            });
        }

        let ack: RetrainAck = serde_json::from_str(&text).unwrap_or_default();
        if ack.reports_error() {
            return Err(WatchdogError::Escalation {
                reason: ack
                    .message
                    .unwrap_or_else(|| "service reported an error".to_string()),
            });
        }
        Ok(ack)
    }
}
