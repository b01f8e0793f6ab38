//! `JobClient` over the embedded store, so the executor can run against
//! it exactly as it would against a remote cluster.

use async_trait::async_trait;

use jobscale_core::{ClientResult, JobClient, JobInstance, LabelSelector, ScaleTarget};

use crate::store::StateStore;

#[async_trait]
impl JobClient for StateStore {
    async fn list_jobs(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> ClientResult<Vec<JobInstance>> {
        Ok(StateStore::list_jobs(self, namespace, selector)?)
    }

    async fn create_job(&self, job: &JobInstance) -> ClientResult<()> {
        StateStore::create_job(self, job)?;
        Ok(())
    }

    async fn delete_job(&self, job: &JobInstance) -> ClientResult<()> {
        Ok(StateStore::delete_job(self, &job.metadata.key())?)
    }

    async fn update_target_status(&self, target: &ScaleTarget) -> ClientResult<()> {
        Ok(StateStore::update_target_status(
            self,
            &target.metadata.key(),
            &target.status,
        )?)
    }
}
