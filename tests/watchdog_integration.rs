//! Integration tests for the watchdog against an in-process scoring service.
//!
//! The stub serves the same three endpoints as the real service (`/`,
//! `/live-feed`, `/retrain`) and can be flipped offline, delayed, or made to
//! fail mid-run, so these tests drive the poller and the escalation
//! controller through the full wire path.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use fraud_watchdog::feed::reconcile;
use fraud_watchdog::{
    classify, Connectivity, EscalationController, EscalationOutcome, FeedHandle, FeedPoller,
    FeedStats, PresentationState, ScoringServiceClient, WatchdogConfig, WatchdogError,
};

#[derive(Clone)]
enum RetrainMode {
    Ok,
    OkWithStats(FeedStats),
    BodyError,
    Http500,
    Slow(Duration),
}

struct StubState {
    live: AtomicBool,
    records: Mutex<Vec<Value>>,
    retrain_hits: AtomicUsize,
    retrain_mode: Mutex<RetrainMode>,
    feed_delay: Mutex<Option<Duration>>,
}

impl Default for StubState {
    fn default() -> Self {
        Self {
            live: AtomicBool::new(true),
            records: Mutex::new(Vec::new()),
            retrain_hits: AtomicUsize::new(0),
            retrain_mode: Mutex::new(RetrainMode::Ok),
            feed_delay: Mutex::new(None),
        }
    }
}

impl StubState {
    fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::SeqCst);
    }

    fn push_record(&self, record: Value) {
        self.records.lock().push(record);
    }

    fn retrain_hits(&self) -> usize {
        self.retrain_hits.load(Ordering::SeqCst)
    }

    fn set_retrain_mode(&self, mode: RetrainMode) {
        *self.retrain_mode.lock() = mode;
    }

    fn set_feed_delay(&self, delay: Option<Duration>) {
        *self.feed_delay.lock() = delay;
    }
}

async fn liveness(State(stub): State<Arc<StubState>>) -> Response {
    if stub.live.load(Ordering::SeqCst) {
        (StatusCode::OK, "Fraud Watchdog API is Awake 🐕").into_response()
    } else {
        StatusCode::SERVICE_UNAVAILABLE.into_response()
    }
}

async fn live_feed(State(stub): State<Arc<StubState>>) -> Response {
    let delay = *stub.feed_delay.lock();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if !stub.live.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(stub.records.lock().clone()).into_response()
}

async fn retrain(State(stub): State<Arc<StubState>>) -> Response {
    stub.retrain_hits.fetch_add(1, Ordering::SeqCst);
    let mode = stub.retrain_mode.lock().clone();
    match mode {
        RetrainMode::Ok => Json(json!({"status": "Retraining Started"})).into_response(),
        RetrainMode::OkWithStats(stats) => Json(json!({
            "status": "success",
            "message": "Global Model Updated!",
            "stats": stats,
        }))
        .into_response(),
        RetrainMode::BodyError => Json(json!({
            "status": "Error",
            "message": "model artifact missing",
        }))
        .into_response(),
        RetrainMode::Http500 => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "boom"}))).into_response()
        }
        RetrainMode::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Json(json!({"status": "Retraining Started"})).into_response()
        }
    }
}

async fn spawn_stub() -> (Arc<StubState>, String) {
    let stub = Arc::new(StubState::default());
    let app = Router::new()
        .route("/", get(liveness))
        .route("/live-feed", get(live_feed))
        .route("/retrain", post(retrain))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (stub, format!("http://{}", addr))
}

fn test_config(base_url: &str, interval_ms: u64) -> WatchdogConfig {
    WatchdogConfig {
        base_url: base_url.to_string(),
        poll_interval: Duration::from_millis(interval_ms),
        request_timeout: Duration::from_secs(2),
        ..WatchdogConfig::default()
    }
}

fn record_json(id: &str, prediction: &str, review: &str, amount: f64, confidence: f64) -> Value {
    json!({
        "id": id,
        "prediction": prediction,
        "confidence_score": confidence,
        "mlops_status": review,
        "amount": amount,
        "timestamp": "12:00:00",
    })
}

async fn wait_until<F: Fn() -> bool>(what: &str, condition: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn feed_tracks_service_snapshots() {
    let (stub, url) = spawn_stub().await;
    let config = test_config(&url, 50);
    let client = ScoringServiceClient::new(&config).unwrap();
    let feed = FeedHandle::new();

    let handle = FeedPoller::new(client, feed.clone(), config.poll_interval, None).spawn();

    // An empty history is a healthy service, not an outage.
    wait_until("first cycle", || feed.health().cycles_completed >= 1).await;
    assert_eq!(feed.connectivity(), Connectivity::Online);
    assert!(feed.is_empty());
    assert_eq!(feed.stats(), FeedStats::default());

    stub.push_record(record_json("txn_1", "FRAUD", "NORMAL", 1200.0, 0.97));
    stub.push_record(record_json(
        "txn_2",
        "LEGITIMATE",
        "UNCERTAIN_GREY_ZONE",
        80.0,
        0.55,
    ));
    // Legacy wire vintage for the third record.
    stub.push_record(record_json("txn_3", "LEGIT", "HIGH_CONFIDENCE", 15.0, 0.99));

    wait_until("three records on the feed", || feed.len() == 3).await;

    assert_eq!(
        feed.stats(),
        FeedStats {
            total: 3,
            fraud_count: 1,
            uncertain_count: 1,
        }
    );

    // Newest first, and each record classified exactly once.
    let records = feed.records();
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["txn_3", "txn_2", "txn_1"]);
    let states: Vec<PresentationState> = records.iter().map(classify).collect();
    assert_eq!(
        states,
        vec![
            PresentationState::Normal,
            PresentationState::Review,
            PresentationState::Fraud,
        ]
    );

    handle.shutdown().await;
    let cycles = feed.health().cycles_completed;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(feed.health().cycles_completed, cycles);
}

#[tokio::test]
async fn outage_keeps_last_view_and_recovery_resumes() {
    let (stub, url) = spawn_stub().await;
    stub.push_record(record_json("txn_1", "FRAUD", "NORMAL", 500.0, 0.9));
    stub.push_record(record_json("txn_2", "LEGITIMATE", "NORMAL", 20.0, 0.8));

    let config = test_config(&url, 50);
    let client = ScoringServiceClient::new(&config).unwrap();
    let feed = FeedHandle::new();
    let handle = FeedPoller::new(client, feed.clone(), config.poll_interval, None).spawn();

    wait_until("records on the feed", || feed.len() == 2).await;
    let stats_before = feed.stats();

    stub.set_live(false);
    wait_until("feed offline", || {
        feed.connectivity() == Connectivity::Offline
    })
    .await;

    // The last good view survives the outage untouched.
    assert_eq!(feed.len(), 2);
    assert_eq!(feed.stats(), stats_before);
    assert!(feed.health().consecutive_failures >= 1);
    assert!(feed.health().last_success_at.is_some());

    stub.set_live(true);
    wait_until("feed back online", || {
        feed.connectivity() == Connectivity::Online
    })
    .await;
    assert_eq!(feed.health().consecutive_failures, 0);
    assert_eq!(feed.len(), 2);

    handle.shutdown().await;
}

#[tokio::test]
async fn malformed_elements_are_dropped_without_losing_the_snapshot() {
    let (stub, url) = spawn_stub().await;
    stub.push_record(record_json("txn_1", "FRAUD", "NORMAL", 100.0, 0.9));
    stub.push_record(json!({"id": "txn_bad"}));
    stub.push_record(record_json("txn_2", "LEGITIMATE", "NORMAL", 10.0, 2.0));
    stub.push_record(record_json("txn_3", "LEGITIMATE", "NORMAL", 10.0, 0.7));

    let config = test_config(&url, 50);
    let client = ScoringServiceClient::new(&config).unwrap();

    let snapshot = client.fetch_snapshot().await.unwrap();
    let ids: Vec<&str> = snapshot.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["txn_1", "txn_3"]);

    let feed = FeedHandle::new();
    reconcile(&feed, snapshot, None);
    assert_eq!(feed.len(), 2);
    assert_eq!(feed.stats().total, 2);
    assert_eq!(feed.connectivity(), Connectivity::Online);
}

#[tokio::test]
async fn trigger_is_single_flight_under_concurrency() {
    let (stub, url) = spawn_stub().await;
    stub.set_retrain_mode(RetrainMode::Slow(Duration::from_millis(300)));

    let config = test_config(&url, 50);
    let client = ScoringServiceClient::new(&config).unwrap();
    let ctl = Arc::new(EscalationController::new(client, FeedHandle::new(), 10));

    let first = {
        let ctl = ctl.clone();
        tokio::spawn(async move { ctl.trigger_adaptation(None).await })
    };
    wait_until("first trigger pending", || ctl.is_syncing()).await;

    // Second press while the first is on the wire: rejected locally.
    let second = ctl.trigger_adaptation(None).await;
    assert!(matches!(
        second.unwrap_err(),
        WatchdogError::EscalationInFlight { .. }
    ));

    let first = first.await.unwrap().unwrap();
    assert_eq!(first.outcome, EscalationOutcome::Succeeded);
    assert_eq!(stub.retrain_hits(), 1);
    assert!(!ctl.is_syncing());

    // Idle again, so the next press goes through.
    stub.set_retrain_mode(RetrainMode::Ok);
    ctl.trigger_adaptation(None).await.unwrap();
    assert_eq!(stub.retrain_hits(), 2);
}

#[tokio::test]
async fn failed_trigger_clears_pending_state() {
    let (stub, url) = spawn_stub().await;
    stub.set_retrain_mode(RetrainMode::Http500);

    let config = test_config(&url, 50);
    let client = ScoringServiceClient::new(&config).unwrap();
    let ctl = EscalationController::new(client, FeedHandle::new(), 10);

    let err = ctl.trigger_adaptation(None).await.unwrap_err();
    assert!(matches!(err, WatchdogError::Escalation { .. }));
    assert!(!ctl.is_syncing());

    stub.set_retrain_mode(RetrainMode::Ok);
    let retry = ctl.trigger_adaptation(None).await.unwrap();
    assert_eq!(retry.outcome, EscalationOutcome::Succeeded);
    assert_eq!(stub.retrain_hits(), 2);

    let history = ctl.history(10);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].outcome, EscalationOutcome::Succeeded);
    assert_eq!(history[1].outcome, EscalationOutcome::Failed);
}

#[tokio::test]
async fn body_reported_error_counts_as_failure() {
    let (stub, url) = spawn_stub().await;
    stub.set_retrain_mode(RetrainMode::BodyError);

    let config = test_config(&url, 50);
    let client = ScoringServiceClient::new(&config).unwrap();
    let ctl = EscalationController::new(client, FeedHandle::new(), 10);

    // HTTP 200, but the body says the service could not start the cycle.
    let err = ctl.trigger_adaptation(None).await.unwrap_err();
    match err {
        WatchdogError::Escalation { reason } => {
            assert!(reason.contains("model artifact missing"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!ctl.is_syncing());
    assert_eq!(stub.retrain_hits(), 1);
}

#[tokio::test]
async fn polling_continues_during_slow_escalation() {
    let (stub, url) = spawn_stub().await;
    stub.push_record(record_json("txn_1", "LEGITIMATE", "NORMAL", 30.0, 0.8));
    stub.set_retrain_mode(RetrainMode::Slow(Duration::from_millis(600)));

    let config = test_config(&url, 50);
    let client = ScoringServiceClient::new(&config).unwrap();
    let feed = FeedHandle::new();
    let handle = FeedPoller::new(
        client.clone(),
        feed.clone(),
        config.poll_interval,
        None,
    )
    .spawn();
    wait_until("first cycle", || feed.health().cycles_completed >= 1).await;

    let ctl = Arc::new(EscalationController::new(client, feed.clone(), 10));
    let trigger = {
        let ctl = ctl.clone();
        tokio::spawn(async move { ctl.trigger_adaptation(Some("txn_1".to_string())).await })
    };
    wait_until("escalation pending", || ctl.is_syncing()).await;

    let cycles_at_start = feed.health().cycles_completed;
    tokio::time::sleep(Duration::from_millis(250)).await;

    // The trigger is still on the wire and the poll loop kept going.
    assert!(ctl.is_syncing());
    assert!(feed.health().cycles_completed >= cycles_at_start + 2);

    let outcome = trigger.await.unwrap().unwrap();
    assert_eq!(outcome.outcome, EscalationOutcome::Succeeded);
    assert_eq!(outcome.source_record.as_deref(), Some("txn_1"));
    assert!(!ctl.is_syncing());

    handle.shutdown().await;
}

#[tokio::test]
async fn retrain_stats_overwrite_lasts_until_next_poll() {
    let (stub, url) = spawn_stub().await;
    stub.push_record(record_json("txn_1", "FRAUD", "NORMAL", 900.0, 0.95));
    stub.push_record(record_json("txn_2", "LEGITIMATE", "NORMAL", 12.0, 0.85));
    let service_stats = FeedStats {
        total: 50,
        fraud_count: 5,
        uncertain_count: 4,
    };
    stub.set_retrain_mode(RetrainMode::OkWithStats(service_stats));

    let config = test_config(&url, 50);
    let client = ScoringServiceClient::new(&config).unwrap();
    let feed = FeedHandle::new();

    let snapshot = client.fetch_snapshot().await.unwrap();
    reconcile(&feed, snapshot, None);
    assert_eq!(feed.stats().total, 2);

    let ctl = EscalationController::new(client.clone(), feed.clone(), 10);
    ctl.trigger_adaptation(None).await.unwrap();
    assert_eq!(feed.stats(), service_stats);

    // The next successful cycle recomputes from the record set.
    let snapshot = client.fetch_snapshot().await.unwrap();
    reconcile(&feed, snapshot, None);
    assert_eq!(feed.stats().total, 2);
    assert_eq!(feed.stats().fraud_count, 1);
}

#[tokio::test]
async fn shutdown_discards_the_in_flight_cycle() {
    let (stub, url) = spawn_stub().await;
    stub.push_record(record_json("txn_1", "FRAUD", "NORMAL", 700.0, 0.9));
    stub.set_feed_delay(Some(Duration::from_millis(500)));

    let config = test_config(&url, 50);
    let client = ScoringServiceClient::new(&config).unwrap();
    let feed = FeedHandle::new();
    let handle = FeedPoller::new(client, feed.clone(), config.poll_interval, None).spawn();

    // Let the first cycle get stuck inside the delayed feed fetch.
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(feed.is_empty());

    handle.shutdown().await;

    // The dropped cycle never lands, even after its response would have
    // arrived.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(feed.is_empty());
    assert_eq!(feed.health().cycles_completed, 0);
    assert_eq!(feed.connectivity(), Connectivity::Connecting);
}
