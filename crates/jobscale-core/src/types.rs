//! Domain types shared by every jobscale crate.
//!
//! These mirror the shape of the resources exposed by the remote
//! orchestration API: a `ScaleTarget` describing the job template and
//! retention limits, and the `JobInstance`s stamped out from it. All
//! types serialize to/from JSON (wire and storage) and TOML (manifests).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of completed jobs retained per target.
pub const DEFAULT_SUCCESSFUL_JOBS_HISTORY_LIMIT: u32 = 100;

/// Default number of failed jobs retained per target.
pub const DEFAULT_FAILED_JOBS_HISTORY_LIMIT: u32 = 100;

/// Default ceiling used when a target does not declare one.
pub const DEFAULT_MAX_REPLICA_COUNT: i64 = 100;

// ── Metadata ──────────────────────────────────────────────────────

/// Identity and labeling common to every stored object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObjectMeta {
    pub name: String,
    /// Prefix from which the remote system derives `name` when it is empty.
    pub generate_name: Option<String>,
    pub namespace: String,
    /// Assigned by the remote system on creation.
    pub uid: String,
    pub labels: BTreeMap<String, String>,
    pub owner_references: Vec<OwnerReference>,
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// Back-reference from a child object to the object that owns it.
///
/// Plain identifier data: the remote system uses it to cascade deletes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
    pub controller: bool,
    pub block_owner_deletion: bool,
}

impl ObjectMeta {
    /// `{namespace}/{name}` key.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// The owner reference flagged as controller, if any.
    pub fn controller_ref(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|r| r.controller)
    }
}

// ── Job template ──────────────────────────────────────────────────

/// Restart policy of the pods a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartPolicy {
    Always,
    OnFailure,
    Never,
}

/// Specification of a job: the template stamped onto every instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobSpec {
    pub parallelism: Option<u32>,
    pub completions: Option<u32>,
    pub backoff_limit: Option<u32>,
    pub active_deadline_seconds: Option<u64>,
    pub ttl_seconds_after_finished: Option<u32>,
    pub template: PodTemplateSpec,
}

/// Pod template embedded in a job spec.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PodTemplateSpec {
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub spec: PodSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PodSpec {
    /// Unset means "let the remote system pick", which for jobs would be
    /// the unsupported `Always`.
    pub restart_policy: Option<RestartPolicy>,
    pub service_account_name: Option<String>,
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Container {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

// ── Job instance ──────────────────────────────────────────────────

/// One unit of work submitted to the remote system.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobInstance {
    pub metadata: ObjectMeta,
    pub spec: JobSpec,
    /// Written exclusively by the remote system.
    pub status: JobStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobStatus {
    pub conditions: Vec<JobCondition>,
    pub start_time: Option<DateTime<Utc>>,
    /// Set once when the job finishes; never changes afterwards.
    pub completion_time: Option<DateTime<Utc>>,
    pub active: u32,
    pub succeeded: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobCondition {
    #[serde(rename = "type")]
    pub type_: JobConditionType,
    pub status: ConditionStatus,
    pub last_transition_time: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobConditionType {
    Complete,
    Failed,
    Suspended,
    FailureTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// Terminal outcome of a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobOutcome {
    Completed,
    Failed,
}

impl JobInstance {
    /// The outcome decided by the first terminal condition whose status
    /// is `True`, or `None` while the job is still running or pending.
    pub fn finished_outcome(&self) -> Option<JobOutcome> {
        self.status
            .conditions
            .iter()
            .filter(|c| c.status == ConditionStatus::True)
            .find_map(|c| match c.type_ {
                JobConditionType::Complete => Some(JobOutcome::Completed),
                JobConditionType::Failed => Some(JobOutcome::Failed),
                _ => None,
            })
    }

    pub fn is_finished(&self) -> bool {
        self.finished_outcome().is_some()
    }
}

// ── Scale target ──────────────────────────────────────────────────

/// The autoscaling configuration resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScaleTarget {
    pub metadata: ObjectMeta,
    pub spec: ScaleTargetSpec,
    pub status: ScaleTargetStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScaleTargetSpec {
    /// Template copied onto every job instance.
    pub job_target_ref: JobSpec,
    pub successful_jobs_history_limit: Option<u32>,
    pub failed_jobs_history_limit: Option<u32>,
    pub max_replica_count: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScaleTargetStatus {
    pub last_active_time: Option<DateTime<Utc>>,
}

impl ScaleTarget {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    /// Ceiling declared on the target, or the default.
    pub fn max_replica_count(&self) -> i64 {
        self.spec
            .max_replica_count
            .unwrap_or(DEFAULT_MAX_REPLICA_COUNT)
    }
}
