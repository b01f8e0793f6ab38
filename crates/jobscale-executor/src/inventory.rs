//! Instance inventory — what jobs a target currently has remotely.
//!
//! Jobs are found solely through the ownership label, and classified by
//! their terminal conditions: anything not `Complete`/`Failed` with a
//! true status counts as running, including jobs still pending.

use tracing::{debug, warn};

use jobscale_core::{JobClient, JobInstance, JobOutcome, LabelSelector, ListFailurePolicy, ScaleTarget};

use crate::cancel::{CancelSignal, guarded};
use crate::error::{ScaleError, ScaleResult};

/// Finished jobs split by outcome, in list order.
#[derive(Debug, Default, Clone)]
pub struct FinishedJobs {
    pub completed: Vec<JobInstance>,
    pub failed: Vec<JobInstance>,
}

/// Per-class counts for one target.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobCounts {
    pub running: i64,
    pub completed: i64,
    pub failed: i64,
}

/// Every job in the target's namespace carrying its ownership label.
pub async fn list_target_jobs(
    client: &dyn JobClient,
    cancel: &CancelSignal,
    target: &ScaleTarget,
) -> ScaleResult<Vec<JobInstance>> {
    let selector = LabelSelector::for_target(target.name());
    let jobs = guarded(cancel, client.list_jobs(target.namespace(), &selector)).await?;
    debug!(%selector, found = jobs.len(), "listed jobs");
    Ok(jobs)
}

pub fn count_running(jobs: &[JobInstance]) -> i64 {
    jobs.iter().filter(|j| !j.is_finished()).count() as i64
}

pub fn partition_finished(jobs: Vec<JobInstance>) -> FinishedJobs {
    let mut finished = FinishedJobs::default();
    for job in jobs {
        match job.finished_outcome() {
            Some(JobOutcome::Completed) => finished.completed.push(job),
            Some(JobOutcome::Failed) => finished.failed.push(job),
            None => {}
        }
    }
    finished
}

pub fn summarize(jobs: &[JobInstance]) -> JobCounts {
    let mut counts = JobCounts::default();
    for job in jobs {
        match job.finished_outcome() {
            Some(JobOutcome::Completed) => counts.completed += 1,
            Some(JobOutcome::Failed) => counts.failed += 1,
            None => counts.running += 1,
        }
    }
    counts
}

/// Number of non-finished jobs for the target.
///
/// A failed list is handled per `policy`: `AssumeNoneRunning` reports
/// zero, `SkipScaling` returns the error. Cancellation always propagates.
pub async fn running_job_count(
    client: &dyn JobClient,
    cancel: &CancelSignal,
    target: &ScaleTarget,
    policy: ListFailurePolicy,
) -> ScaleResult<i64> {
    match list_target_jobs(client, cancel, target).await {
        Ok(jobs) => Ok(count_running(&jobs)),
        Err(ScaleError::Cancelled) => Err(ScaleError::Cancelled),
        Err(e) => match policy {
            ListFailurePolicy::AssumeNoneRunning => {
                warn!(error = %e, "cannot list jobs, assuming none are running");
                Ok(0)
            }
            ListFailurePolicy::SkipScaling => Err(e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::cancel::never_cancelled;
    use crate::testing::*;

    fn mixed_jobs() -> Vec<JobInstance> {
        vec![
            running_job("worker", "r1"),
            finished_job("worker", "c1", JobOutcome::Completed, Some(at(10))),
            running_job("worker", "r2"),
            finished_job("worker", "f1", JobOutcome::Failed, None),
            finished_job("worker", "c2", JobOutcome::Completed, Some(at(5))),
            running_job("other", "x1"),
            finished_job("other", "x2", JobOutcome::Failed, Some(at(1))),
        ]
    }

    #[tokio::test]
    async fn lists_only_the_targets_jobs() {
        let client = FakeClient::with_jobs(mixed_jobs());
        let jobs = list_target_jobs(&client, &never_cancelled(), &target("worker"))
            .await
            .unwrap();
        assert_eq!(jobs.len(), 5);
        assert!(
            jobs.iter()
                .all(|j| j.metadata.labels.get("scaledjob").map(String::as_str) == Some("worker"))
        );
    }

    #[tokio::test]
    async fn counts_unfinished_jobs() {
        let client = FakeClient::with_jobs(mixed_jobs());
        let running = running_job_count(
            &client,
            &never_cancelled(),
            &target("worker"),
            ListFailurePolicy::AssumeNoneRunning,
        )
        .await
        .unwrap();
        assert_eq!(running, 2);
    }

    #[tokio::test]
    async fn list_failure_counts_zero_by_default() {
        let client = FakeClient::with_jobs(mixed_jobs());
        client.list_fails.store(true, Ordering::SeqCst);
        let running = running_job_count(
            &client,
            &never_cancelled(),
            &target("worker"),
            ListFailurePolicy::AssumeNoneRunning,
        )
        .await
        .unwrap();
        assert_eq!(running, 0);
    }

    #[tokio::test]
    async fn list_failure_propagates_when_skipping() {
        let client = FakeClient::new();
        client.list_fails.store(true, Ordering::SeqCst);
        let err = running_job_count(
            &client,
            &never_cancelled(),
            &target("worker"),
            ListFailurePolicy::SkipScaling,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScaleError::Client(_)));
    }

    #[test]
    fn partitions_by_outcome_keeping_order() {
        let finished = partition_finished(mixed_jobs());
        let names = |jobs: &[JobInstance]| -> Vec<String> {
            jobs.iter().map(|j| j.metadata.name.clone()).collect()
        };
        assert_eq!(names(&finished.completed), ["c1", "c2"]);
        assert_eq!(names(&finished.failed), ["f1", "x2"]);
    }

    #[test]
    fn summary_counts_each_class() {
        let counts = summarize(&mixed_jobs());
        assert_eq!(
            counts,
            JobCounts {
                running: 3,
                completed: 2,
                failed: 2
            }
        );
    }
}
