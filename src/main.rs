use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use statuspulse::{api, Engine, EngineConfig};

/// Periodically checks service liveness and writes a status snapshot.
#[derive(Debug, Parser)]
#[command(name = "statuspulse", version)]
struct Cli {
    /// JSON engine configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target list (overrides `targets_path`)
    #[arg(long)]
    targets: Option<PathBuf>,

    /// Snapshot destination (overrides `status_path`)
    #[arg(long)]
    status: Option<PathBuf>,

    /// Maximum checks in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// Repeat every N seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Run a single tick even if an interval is configured
    #[arg(long)]
    once: bool,

    /// Serve the snapshot on this port
    #[arg(long)]
    api_port: Option<u16>,
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    if let Some(targets) = &cli.targets {
        config.targets_path = targets.clone();
    }
    if let Some(status) = &cli.status {
        config.status_path = status.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.max_concurrency = concurrency;
    }
    if cli.interval.is_some() {
        config.interval_secs = cli.interval;
    }
    if cli.api_port.is_some() {
        config.api_port = cli.api_port;
    }
    if cli.once {
        config.interval_secs = None;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    info!(
        targets = %config.targets_path.display(),
        status = %config.status_path.display(),
        max_concurrency = config.max_concurrency,
        interval_secs = ?config.interval_secs,
        "Configuration loaded"
    );

    let engine = Engine::new(config.clone())?;

    if let Some(port) = config.api_port {
        let status_path = config.status_path.clone();
        tokio::spawn(async move {
            if let Err(e) = api::start_server(port, status_path).await {
                error!("Status endpoint failed: {:#}", e);
            }
        });
    }

    let Some(secs) = config.interval_secs.filter(|s| *s > 0) else {
        engine.run_tick().await.context("Tick failed")?;
        return Ok(());
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = engine.run_tick().await {
                    error!(error = %e, "Tick failed, stopping");
                    return Err(e).context("Tick failed");
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received. Stopping checks...");
                break;
            }
        }
    }

    Ok(())
}
