//! Retention pruner — enforces the per-outcome history limits.
//!
//! Completed and failed jobs are pruned independently, oldest completion
//! time first. Unlike creation, deletion stops at the first failure so a
//! partition is never pruned out of order.

use tracing::{debug, info};

use jobscale_core::{ExecutorConfig, JobClient, JobInstance, ScaleTarget};

use crate::cancel::{CancelSignal, guarded};
use crate::error::{ScaleError, ScaleResult};
use crate::inventory::{list_target_jobs, partition_finished};

/// History limits in effect for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    pub successful: u32,
    pub failed: u32,
}

impl HistoryLimits {
    /// Target overrides, falling back to the configured defaults.
    pub fn for_target(target: &ScaleTarget, config: &ExecutorConfig) -> Self {
        Self {
            successful: target
                .spec
                .successful_jobs_history_limit
                .unwrap_or(config.successful_jobs_history_limit),
            failed: target
                .spec
                .failed_jobs_history_limit
                .unwrap_or(config.failed_jobs_history_limit),
        }
    }
}

/// Jobs removed by one cleanup pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PruneReport {
    pub completed_deleted: usize,
    pub failed_deleted: usize,
}

/// Stable ascending sort by completion time. Jobs without one sort first.
pub fn sort_by_completion_time(jobs: &mut [JobInstance]) {
    jobs.sort_by_key(|job| job.status.completion_time);
}

/// The jobs that must go to bring `jobs` (sorted oldest first) within `limit`.
pub fn excess(jobs: &[JobInstance], limit: u32) -> &[JobInstance] {
    let limit = limit as usize;
    if jobs.len() <= limit {
        return &[];
    }
    &jobs[..jobs.len() - limit]
}

/// Delete the oldest jobs beyond `limit`, stopping at the first failure.
pub async fn delete_over_limit(
    client: &dyn JobClient,
    cancel: &CancelSignal,
    jobs: &[JobInstance],
    limit: u32,
) -> ScaleResult<usize> {
    let doomed = excess(jobs, limit);
    for job in doomed {
        guarded(cancel, client.delete_job(job))
            .await
            .map_err(|e| match e {
                ScaleError::Client(source) => ScaleError::Delete {
                    job: job.metadata.name.clone(),
                    source,
                },
                other => other,
            })?;
        info!(job = %job.metadata.name, history_limit = limit, "removed job over history limit");
    }
    Ok(doomed.len())
}

/// One full retention pass for a target.
///
/// Completed jobs are pruned before failed ones; an error in the first
/// partition skips the second.
pub async fn clean_up(
    client: &dyn JobClient,
    cancel: &CancelSignal,
    target: &ScaleTarget,
    limits: HistoryLimits,
) -> ScaleResult<PruneReport> {
    let jobs = list_target_jobs(client, cancel, target).await?;
    let mut finished = partition_finished(jobs);
    sort_by_completion_time(&mut finished.completed);
    sort_by_completion_time(&mut finished.failed);
    debug!(
        completed = finished.completed.len(),
        failed = finished.failed.len(),
        successful_limit = limits.successful,
        failed_limit = limits.failed,
        "checking history limits"
    );

    let completed_deleted =
        delete_over_limit(client, cancel, &finished.completed, limits.successful).await?;
    let failed_deleted =
        delete_over_limit(client, cancel, &finished.failed, limits.failed).await?;

    Ok(PruneReport {
        completed_deleted,
        failed_deleted,
    })
}
