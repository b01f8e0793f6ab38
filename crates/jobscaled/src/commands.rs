//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, bail};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use jobscale_core::{JobscaleConfig, ScaleTarget};
use jobscale_executor::inventory::{list_target_jobs, summarize};
use jobscale_executor::{CancelSignal, ScaleExecutor, ScaleReport, never_cancelled};
use jobscale_state::StateStore;

/// Inputs normally supplied by the metric evaluation that sits in front
/// of the executor.
#[derive(Debug, Clone, Copy)]
pub struct ScaleRequest {
    pub is_active: bool,
    pub desired: i64,
    pub ceiling: Option<i64>,
}

/// Loaded config plus the opened store.
pub struct Context {
    pub config: JobscaleConfig,
    pub store: StateStore,
    pub executor: ScaleExecutor,
}

impl Context {
    pub fn load(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = match config_path {
            Some(path) => JobscaleConfig::from_file(path)?,
            None => JobscaleConfig::default(),
        };
        if let Some(dir) = data_dir {
            config.daemon.data_dir = dir;
        }

        std::fs::create_dir_all(&config.daemon.data_dir).with_context(|| {
            format!("creating data dir {}", config.daemon.data_dir.display())
        })?;
        let db_path = config.daemon.data_dir.join("jobscale.redb");
        let store = StateStore::open(&db_path)?;
        info!(path = ?db_path, "job store opened");

        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: JobscaleConfig, store: StateStore) -> Self {
        let executor = ScaleExecutor::new(Arc::new(store.clone()), config.executor.clone());
        Self {
            config,
            store,
            executor,
        }
    }

    fn target(&self, key: &str) -> anyhow::Result<ScaleTarget> {
        if key.split('/').count() != 2 {
            bail!("target must be given as namespace/name, got {key:?}");
        }
        self.store
            .get_target(key)?
            .with_context(|| format!("target {key} not found"))
    }
}

pub fn apply(ctx: &Context, manifest: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(manifest)
        .with_context(|| format!("reading {}", manifest.display()))?;
    let target: ScaleTarget = toml::from_str(&content)
        .with_context(|| format!("parsing {}", manifest.display()))?;
    let stored = ctx.store.apply_target(&target)?;
    println!("{} applied (uid {})", stored.metadata.key(), stored.metadata.uid);
    Ok(())
}

pub async fn list(ctx: &Context) -> anyhow::Result<()> {
    let cancel = never_cancelled();
    println!(
        "{:<40} {:>8} {:>10} {:>7} {:>8}",
        "TARGET", "RUNNING", "COMPLETED", "FAILED", "CEILING"
    );
    for target in ctx.store.list_targets()? {
        let jobs = list_target_jobs(&ctx.store, &cancel, &target).await?;
        let counts = summarize(&jobs);
        println!(
            "{:<40} {:>8} {:>10} {:>7} {:>8}",
            target.metadata.key(),
            counts.running,
            counts.completed,
            counts.failed,
            target.max_replica_count()
        );
    }
    Ok(())
}

pub async fn scale(ctx: &Context, key: &str, request: ScaleRequest) -> anyhow::Result<()> {
    let mut target = ctx.target(key)?;
    let report = scale_once(ctx, &never_cancelled(), &mut target, request).await;
    print_report(key, &report);
    Ok(())
}

pub async fn run(
    ctx: &Context,
    key: &str,
    request: ScaleRequest,
    interval: Option<u64>,
) -> anyhow::Result<()> {
    let (cancel_tx, cancel) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = cancel_tx.send(true);
            }
            Err(e) => warn!(error = %e, "failed to listen for Ctrl-C, loop cannot be interrupted"),
        }
    });
    run_until(ctx, key, request, interval, cancel).await
}

/// Scale passes on an interval until `cancel` fires. A dropped sender
/// only disables shutdown; it never stops the loop.
async fn run_until(
    ctx: &Context,
    key: &str,
    request: ScaleRequest,
    interval: Option<u64>,
    cancel: CancelSignal,
) -> anyhow::Result<()> {
    let interval = Duration::from_secs(interval.unwrap_or(ctx.config.daemon.interval_secs));
    info!(scale_target = %key, interval_secs = interval.as_secs(), "scale loop started");
    let mut shutdown = cancel.clone();
    let mut signal_lost = false;
    loop {
        // Re-read every pass: the target may have been re-applied or deleted.
        let mut target = ctx.target(key)?;
        let report = scale_once(ctx, &cancel, &mut target, request).await;
        debug!(?report, "scale pass finished");
        if report.cancelled || *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed(), if !signal_lost => match changed {
                Ok(()) => break,
                Err(_) => {
                    warn!(scale_target = %key, "shutdown signal dropped, continuing without it");
                    signal_lost = true;
                    tokio::time::sleep(interval).await;
                }
            },
        }
    }
    info!(scale_target = %key, "scale loop shutting down");
    Ok(())
}

pub async fn prune(ctx: &Context, key: &str) -> anyhow::Result<()> {
    let target = ctx.target(key)?;
    let report = ctx.executor.clean_up(&never_cancelled(), &target).await?;
    println!(
        "{key}: deleted {} completed, {} failed",
        report.completed_deleted, report.failed_deleted
    );
    Ok(())
}

async fn scale_once(
    ctx: &Context,
    cancel: &CancelSignal,
    target: &mut ScaleTarget,
    request: ScaleRequest,
) -> ScaleReport {
    let ceiling = request
        .ceiling
        .unwrap_or_else(|| target.max_replica_count());
    if ceiling < 0 {
        warn!(ceiling, "negative ceiling, nothing will be created");
    }
    ctx.executor
        .scale(cancel, target, request.is_active, request.desired, ceiling)
        .await
}

fn print_report(key: &str, report: &ScaleReport) {
    let running = report
        .running
        .map_or_else(|| "unknown".to_string(), |n| n.to_string());
    let created = report
        .created
        .map_or_else(|| "-".to_string(), |c| format!("{}/{}", c.created, c.requested));
    let pruned = report.pruned.map_or_else(
        || "failed".to_string(),
        |p| format!("{} completed, {} failed", p.completed_deleted, p.failed_deleted),
    );
    println!(
        "{key}: running {running}, headroom {}, created {created}, pruned {pruned}",
        report.effective_ceiling
    );
}
