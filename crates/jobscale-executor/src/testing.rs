//! Scripted in-memory `JobClient` for unit tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use jobscale_core::labels::SCALED_JOB_LABEL;
use jobscale_core::{
    ClientError, ClientResult, ConditionStatus, JobClient, JobCondition, JobConditionType,
    JobInstance, JobOutcome, JobStatus, LabelSelector, ObjectMeta, ScaleTarget,
};

/// Fake remote system. Failures are injected per call index (1-based).
#[derive(Default)]
pub(crate) struct FakeClient {
    jobs: Mutex<Vec<JobInstance>>,
    pub list_fails: AtomicBool,
    pub list_hangs: AtomicBool,
    pub status_update_fails: AtomicBool,
    pub owner_reference_fails: AtomicBool,
    pub failing_creates: Mutex<HashSet<usize>>,
    pub failing_delete: Mutex<Option<usize>>,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    pub status_updates: Mutex<Vec<ScaleTarget>>,
    pub deleted: Mutex<Vec<String>>,
    next_id: AtomicUsize,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs(jobs: Vec<JobInstance>) -> Self {
        let client = Self::new();
        *client.jobs.lock().unwrap() = jobs;
        client
    }

    pub fn jobs(&self) -> Vec<JobInstance> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobClient for FakeClient {
    async fn list_jobs(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> ClientResult<Vec<JobInstance>> {
        if self.list_hangs.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable("list refused".to_string()));
        }
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.metadata.namespace == namespace && selector.matches(&j.metadata.labels))
            .cloned()
            .collect())
    }

    async fn create_job(&self, job: &JobInstance) -> ClientResult<()> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_creates.lock().unwrap().contains(&call) {
            return Err(ClientError::Unavailable(format!("create #{call} refused")));
        }
        let mut stored = job.clone();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let prefix = stored.metadata.generate_name.clone().unwrap_or_default();
        stored.metadata.name = format!("{prefix}{id:05}");
        self.jobs.lock().unwrap().push(stored);
        Ok(())
    }

    async fn delete_job(&self, job: &JobInstance) -> ClientResult<()> {
        let call = self.delete_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.failing_delete.lock().unwrap() == Some(call) {
            return Err(ClientError::Unavailable(format!("delete #{call} refused")));
        }
        let mut jobs = self.jobs.lock().unwrap();
        let before = jobs.len();
        jobs.retain(|j| j.metadata.key() != job.metadata.key());
        if jobs.len() == before {
            return Err(ClientError::NotFound(job.metadata.key()));
        }
        self.deleted.lock().unwrap().push(job.metadata.name.clone());
        Ok(())
    }

    async fn update_target_status(&self, target: &ScaleTarget) -> ClientResult<()> {
        if self.status_update_fails.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable("status refused".to_string()));
        }
        self.status_updates.lock().unwrap().push(target.clone());
        Ok(())
    }

    fn set_owner_reference(
        &self,
        owner: &ScaleTarget,
        child: &mut JobInstance,
    ) -> ClientResult<()> {
        if self.owner_reference_fails.load(Ordering::SeqCst) {
            return Err(ClientError::Invalid("owner refused".to_string()));
        }
        jobscale_core::client::set_controller_reference(owner, child)
    }
}

// ── Fixtures ──────────────────────────────────────────────────────

pub(crate) fn target(name: &str) -> ScaleTarget {
    ScaleTarget {
        metadata: ObjectMeta {
            name: name.to_string(),
            namespace: "batch".to_string(),
            uid: format!("uid-{name}"),
            ..ObjectMeta::default()
        },
        ..ScaleTarget::default()
    }
}

pub(crate) fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// A job owned by `owner`, still running.
pub(crate) fn running_job(owner: &str, name: &str) -> JobInstance {
    let mut job = JobInstance::default();
    job.metadata.name = name.to_string();
    job.metadata.namespace = "batch".to_string();
    job.metadata
        .labels
        .insert(SCALED_JOB_LABEL.to_string(), owner.to_string());
    job
}

/// A job owned by `owner` that finished with `outcome` at `finished`.
pub(crate) fn finished_job(
    owner: &str,
    name: &str,
    outcome: JobOutcome,
    finished: Option<DateTime<Utc>>,
) -> JobInstance {
    let mut job = running_job(owner, name);
    let type_ = match outcome {
        JobOutcome::Completed => JobConditionType::Complete,
        JobOutcome::Failed => JobConditionType::Failed,
    };
    job.status = JobStatus {
        conditions: vec![JobCondition {
            type_,
            status: ConditionStatus::True,
            last_transition_time: finished,
            reason: None,
            message: None,
        }],
        completion_time: finished,
        ..JobStatus::default()
    };
    job
}
