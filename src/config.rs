//! Environment-driven configuration.
//!
//! Every knob has a default that points at a local scoring service, so the
//! binary runs with no `.env` at all. CLI flags may override individual
//! fields after `from_env`.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// Scoring service base URL, no trailing slash required.
    pub base_url: String,
    /// Path of the full-history feed endpoint.
    pub feed_path: String,
    /// Path of the retrain trigger endpoint.
    pub retrain_path: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Upper bound on records retained locally. `None` keeps everything the
    /// service serves.
    pub max_records: Option<usize>,
    /// Completed escalation attempts kept in memory.
    pub escalation_history_cap: usize,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            feed_path: "/live-feed".to_string(),
            retrain_path: "/retrain".to_string(),
            poll_interval: Duration::from_millis(1000),
            request_timeout: Duration::from_millis(5000),
            max_records: None,
            escalation_history_cap: 100,
        }
    }
}

impl WatchdogConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let poll_interval_ms = env::var("WATCHDOG_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.poll_interval.as_millis() as u64);

        let request_timeout_ms = env::var("WATCHDOG_REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.request_timeout.as_millis() as u64);

        let max_records = env::var("WATCHDOG_MAX_RECORDS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .or(defaults.max_records);

        let escalation_history_cap = env::var("WATCHDOG_ESCALATION_HISTORY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.escalation_history_cap);

        Self {
            base_url: env::var("WATCHDOG_URL").unwrap_or(defaults.base_url),
            feed_path: env::var("WATCHDOG_FEED_PATH").unwrap_or(defaults.feed_path),
            retrain_path: env::var("WATCHDOG_RETRAIN_PATH").unwrap_or(defaults.retrain_path),
            poll_interval: Duration::from_millis(poll_interval_ms),
            request_timeout: Duration::from_millis(request_timeout_ms),
            max_records,
            escalation_history_cap,
        }
    }
}
