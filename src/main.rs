//! Fraud Watchdog - live monitor for a transaction-scoring service.
//!
//! Subcommands:
//!   watch    poll the service continuously and print feed activity (default)
//!   stats    fetch one snapshot, aggregate it, print the stats as JSON
//!   trigger  fire one adaptation/retrain request and report the outcome

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fraud_watchdog::{
    feed, EscalationController, FeedHandle, FeedPoller, ScoringServiceClient, WatchdogConfig,
};

#[derive(Parser, Debug)]
#[command(name = "watchdog")]
#[command(about = "Live monitor and retrain control for a fraud-scoring service")]
struct Cli {
    /// Scoring service base URL
    #[arg(long, env = "WATCHDOG_URL")]
    url: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long, env = "WATCHDOG_POLL_INTERVAL_MS")]
    interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the service continuously and print feed activity
    Watch,
    /// Fetch one snapshot, aggregate it, and print the stats as JSON
    Stats,
    /// Fire one adaptation/retrain request and report the outcome
    Trigger {
        /// Grey-zone record id that prompted the escalation (audit note)
        #[arg(long)]
        record: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = WatchdogConfig::from_env();
    if let Some(url) = cli.url {
        config.base_url = url;
    }
    if let Some(ms) = cli.interval_ms {
        config.poll_interval = Duration::from_millis(ms);
    }

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => watch(config).await,
        Commands::Stats => stats(config).await,
        Commands::Trigger { record } => trigger(config, record).await,
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fraud_watchdog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn watch(config: WatchdogConfig) -> Result<()> {
    info!("🛡️ Fraud Watchdog starting");
    info!(
        "🐕 Watching {} every {}ms",
        config.base_url,
        config.poll_interval.as_millis()
    );

    let client =
        ScoringServiceClient::new(&config).context("Failed to build scoring service client")?;
    let feed = FeedHandle::new();
    let poller = FeedPoller::new(
        client,
        feed.clone(),
        config.poll_interval,
        config.max_records,
    );
    let handle = poller.spawn();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    info!("🛑 Received Ctrl+C, shutting down");
    handle.shutdown().await;

    let health = feed.health();
    info!(
        "👋 Stopped after {} poll cycles, {} records on the feed",
        health.cycles_completed,
        feed.len()
    );
    Ok(())
}

async fn stats(config: WatchdogConfig) -> Result<()> {
    let client =
        ScoringServiceClient::new(&config).context("Failed to build scoring service client")?;
    client.liveness().await?;
    let snapshot = client.fetch_snapshot().await?;
    let stats = feed::aggregate(&snapshot);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

async fn trigger(config: WatchdogConfig, record: Option<String>) -> Result<()> {
    let client =
        ScoringServiceClient::new(&config).context("Failed to build scoring service client")?;
    let controller =
        EscalationController::new(client, FeedHandle::new(), config.escalation_history_cap);

    let outcome = controller.trigger_adaptation(record).await?;
    info!("🚀 MLOps cycle started: {}", outcome.detail);
    Ok(())
}
