//! Scale executor — one reconcile pass for a scale target.
//!
//! ```text
//! request_job_scale
//!   ├── running_job_count   (inventory)
//!   ├── effective_ceiling   (planner)
//!   ├── if active: last_active_time → update_target_status
//!   │             create_jobs(min(desired, headroom))   (factory)
//!   └── clean_up            (pruner, always)
//! ```
//!
//! Nothing is retried here and nothing is raised to the caller; the next
//! invocation re-reads the remote state and converges from there.

use std::sync::Arc;

use chrono::Utc;
use tracing::{Instrument, debug, error, info, info_span, warn};

use jobscale_core::{ExecutorConfig, JobClient, ScaleTarget};

use crate::cancel::{CancelSignal, guarded};
use crate::error::{ScaleError, ScaleResult};
use crate::factory::{CreateReport, InstanceFactory};
use crate::inventory::running_job_count;
use crate::planner::{effective_ceiling, jobs_to_create};
use crate::pruner::{HistoryLimits, PruneReport, clean_up};

/// What one invocation observed and did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScaleReport {
    /// `None` when the running count could not be determined.
    pub running: Option<i64>,
    pub effective_ceiling: i64,
    /// `None` when the target was inactive or creation was skipped.
    pub created: Option<CreateReport>,
    /// `None` when cleanup failed or never ran.
    pub pruned: Option<PruneReport>,
    pub cancelled: bool,
}

/// Runs scale requests for job targets against a remote client.
pub struct ScaleExecutor {
    client: Arc<dyn JobClient>,
    config: ExecutorConfig,
    factory: InstanceFactory,
}

impl ScaleExecutor {
    pub fn new(client: Arc<dyn JobClient>, config: ExecutorConfig) -> Self {
        let factory = InstanceFactory::new(config.managed_by.clone());
        Self {
            client,
            config,
            factory,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Scale `target` towards `scale_to` new jobs, bounded by `max_scale`
    /// concurrently running ones, then prune finished-job history.
    ///
    /// Never fails; every error is logged. Callers must not run two
    /// requests for the same target concurrently, or the ceiling may be
    /// overshot by the overlapping creates.
    pub async fn request_job_scale(
        &self,
        cancel: &CancelSignal,
        target: &mut ScaleTarget,
        is_active: bool,
        scale_to: i64,
        max_scale: i64,
    ) {
        self.scale(cancel, target, is_active, scale_to, max_scale)
            .await;
    }

    /// Same as [`request_job_scale`](Self::request_job_scale), returning
    /// what happened.
    pub async fn scale(
        &self,
        cancel: &CancelSignal,
        target: &mut ScaleTarget,
        is_active: bool,
        scale_to: i64,
        max_scale: i64,
    ) -> ScaleReport {
        let span = info_span!(
            "scale_job",
            name = %target.name(),
            namespace = %target.namespace(),
        );
        async move {
            let mut report = ScaleReport::default();
            match self
                .scale_out(cancel, target, is_active, scale_to, max_scale, &mut report)
                .await
            {
                Ok(()) => {}
                Err(ScaleError::Cancelled) => {
                    warn!("scale request cancelled");
                    report.cancelled = true;
                    return report;
                }
                Err(e) => error!(error = %e, "skipping job creation"),
            }

            match self.clean_up(cancel, target).await {
                Ok(pruned) => report.pruned = Some(pruned),
                Err(ScaleError::Cancelled) => {
                    warn!("cleanup cancelled");
                    report.cancelled = true;
                }
                Err(e) => error!(error = %e, "failed to clean up jobs"),
            }
            report
        }
        .instrument(span)
        .await
    }

    /// Retention pass only.
    pub async fn clean_up(
        &self,
        cancel: &CancelSignal,
        target: &ScaleTarget,
    ) -> ScaleResult<PruneReport> {
        let limits = HistoryLimits::for_target(target, &self.config);
        clean_up(self.client.as_ref(), cancel, target, limits).await
    }

    async fn scale_out(
        &self,
        cancel: &CancelSignal,
        target: &mut ScaleTarget,
        is_active: bool,
        scale_to: i64,
        max_scale: i64,
        report: &mut ScaleReport,
    ) -> ScaleResult<()> {
        let client = self.client.as_ref();
        let running =
            running_job_count(client, cancel, target, self.config.on_list_failure).await?;
        report.running = Some(running);
        report.effective_ceiling = effective_ceiling(max_scale, running);
        info!(running, "scaling jobs");

        if !is_active {
            debug!("no change in activity");
            return Ok(());
        }

        debug!("at least one scaler is active");
        target.status.last_active_time = Some(Utc::now());
        match guarded(cancel, client.update_target_status(target)).await {
            Ok(()) => {}
            Err(ScaleError::Cancelled) => return Err(ScaleError::Cancelled),
            Err(e) => error!(error = %e, "failed to update last active time"),
        }

        let count = jobs_to_create(scale_to, report.effective_ceiling);
        debug!(
            effective_max = report.effective_ceiling,
            desired = scale_to,
            count,
            "planned job creation"
        );
        let created = self
            .factory
            .create_jobs(client, cancel, target, count)
            .await?;
        report.created = Some(created);
        Ok(())
    }
}
