//! Instance factory — stamps job instances out of a target's template.
//!
//! Creation is a best-effort fan-out: one remote create per job, and a
//! failed create is logged without stopping the rest of the batch. Only
//! cancellation ends the batch early.

use std::collections::BTreeMap;

use tracing::{debug, error, info};

use jobscale_core::labels::{
    APP_MANAGED_BY_LABEL, APP_NAME_LABEL, APP_PART_OF_LABEL, APP_VERSION_LABEL, SCALED_JOB_LABEL,
};
use jobscale_core::{JobClient, JobInstance, ObjectMeta, RestartPolicy, ScaleTarget};

use crate::cancel::{CancelSignal, guarded};
use crate::error::{ScaleError, ScaleResult};

/// Version stamped into `app.kubernetes.io/version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Outcome of one creation batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CreateReport {
    pub requested: i64,
    pub created: i64,
    pub failed: i64,
}

/// Builds and submits job instances for a target.
#[derive(Debug, Clone)]
pub struct InstanceFactory {
    managed_by: String,
}

impl InstanceFactory {
    pub fn new(managed_by: impl Into<String>) -> Self {
        Self {
            managed_by: managed_by.into(),
        }
    }

    /// Build one job from the target's template.
    ///
    /// The spec is a fresh copy of the template, so nothing done to the
    /// job reaches the target or any sibling job.
    pub fn build_job(&self, target: &ScaleTarget) -> JobInstance {
        let name = target.name();
        let labels = BTreeMap::from([
            (APP_NAME_LABEL.to_string(), name.to_string()),
            (APP_VERSION_LABEL.to_string(), VERSION.to_string()),
            (APP_PART_OF_LABEL.to_string(), name.to_string()),
            (APP_MANAGED_BY_LABEL.to_string(), self.managed_by.clone()),
            (SCALED_JOB_LABEL.to_string(), name.to_string()),
        ]);

        let mut spec = target.spec.job_target_ref.clone();
        spec.template
            .labels
            .insert(SCALED_JOB_LABEL.to_string(), name.to_string());

        // Jobs reject `Always`, which is what an unset policy defaults to.
        let pod = &mut spec.template.spec;
        if pod.restart_policy.is_none() {
            debug!("restart policy unset, using OnFailure");
            pod.restart_policy = Some(RestartPolicy::OnFailure);
        }

        JobInstance {
            metadata: ObjectMeta {
                generate_name: Some(format!("{name}-")),
                namespace: target.namespace().to_string(),
                labels,
                ..ObjectMeta::default()
            },
            spec,
            status: Default::default(),
        }
    }

    /// Create `count` jobs for the target.
    ///
    /// Returns `Err` only when cancelled; individual create failures are
    /// counted in the report.
    pub async fn create_jobs(
        &self,
        client: &dyn JobClient,
        cancel: &CancelSignal,
        target: &ScaleTarget,
        count: i64,
    ) -> ScaleResult<CreateReport> {
        let mut report = CreateReport {
            requested: count.max(0),
            ..CreateReport::default()
        };
        info!(count = report.requested, "creating jobs");

        for _ in 0..report.requested {
            let mut job = self.build_job(target);

            if let Err(e) = client.set_owner_reference(target, &mut job) {
                error!(error = %e, "failed to set target as owner of new job");
            }

            match guarded(cancel, client.create_job(&job)).await {
                Ok(()) => report.created += 1,
                Err(ScaleError::Cancelled) => return Err(ScaleError::Cancelled),
                Err(e) => {
                    report.failed += 1;
                    error!(error = %e, "failed to create job");
                }
            }
        }

        info!(
            created = report.created,
            failed = report.failed,
            "created jobs"
        );
        Ok(report)
    }
}

impl Default for InstanceFactory {
    fn default() -> Self {
        Self::new(jobscale_core::labels::DEFAULT_MANAGED_BY)
    }
}
