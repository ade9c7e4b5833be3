use anyhow::{Context, Result};
use chrono::{SubsecRound, Utc};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::checks::{check_gsp, check_http, check_tcp};
use crate::config::EngineConfig;
use crate::error::TickResult;
use crate::models::CheckResult;
use crate::pool::run_bounded;
use crate::router::{route, Route};
use crate::store::{load_snapshot, merge, persist};
use crate::target::{load_targets, TargetDescriptor};

/// Summary of one completed tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub targets: usize,
    pub online: usize,
    pub disabled: usize,
    pub skipped: usize,
    pub persisted: usize,
    pub elapsed: Duration,
}

pub struct Engine {
    config: EngineConfig,
    http_client: reqwest::Client,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("statuspulse/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            // targets are dialed directly, never through an environment proxy
            .no_proxy()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, http_client })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Routes one target to its checker. Never fails.
    pub async fn check(&self, target: &TargetDescriptor) -> CheckResult {
        match route(target) {
            Route::Disabled => CheckResult::disabled(),
            Route::Unreachable => CheckResult::skipped(),
            Route::Http(url) => check_http(&self.http_client, url, target.timeout).await,
            Route::Tcp { host, port } => {
                check_tcp(host, port, target.timeout, self.config.tcp_grace()).await
            }
            Route::Gsp { host, port } => {
                check_gsp(
                    host,
                    port,
                    target.timeout,
                    self.config.tcp_grace(),
                    self.config.gsp_protocol_version,
                )
                .await
            }
        }
    }

    /// Checks every target with bounded concurrency; `results[i]` is for `targets[i]`.
    pub async fn check_all(&self, targets: &[TargetDescriptor]) -> Vec<CheckResult> {
        run_bounded(
            targets,
            self.config.max_concurrency,
            |t| self.check(t),
            |t| {
                warn!(id = t.label(), "check aborted with an internal error");
                CheckResult::internal_error()
            },
        )
        .await
    }

    /// Target list -> checks -> merge with previous snapshot -> atomic write.
    ///
    /// Fails only on an unusable target list, an unreadable or corrupt previous
    /// snapshot, or a failed write. The existing snapshot is untouched on failure.
    pub async fn run_tick(&self) -> TickResult<TickReport> {
        let start = Instant::now();

        let targets = load_targets(&self.config.targets_path, self.config.default_timeout()).await?;
        let prev = load_snapshot(&self.config.status_path).await?;

        let results = self.check_all(&targets).await;
        for (target, res) in targets.iter().zip(&results) {
            tracing::debug!(
                id = target.label(),
                online = res.online,
                rtt_ms = ?res.rtt_ms(),
                "checked"
            );
        }

        let snapshot = merge(&prev, &targets, &results, Utc::now().trunc_subsecs(3));
        persist(&self.config.status_path, &snapshot).await?;

        let report = TickReport {
            targets: targets.len(),
            online: results.iter().filter(|r| r.online).count(),
            disabled: results.iter().filter(|r| r.is_disabled()).count(),
            skipped: results.iter().filter(|r| r.is_skipped()).count(),
            persisted: snapshot.len(),
            elapsed: start.elapsed(),
        };
        info!(
            targets = report.targets,
            online = report.online,
            disabled = report.disabled,
            skipped = report.skipped,
            persisted = report.persisted,
            "Tick completed in {:.2}s",
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }
}
