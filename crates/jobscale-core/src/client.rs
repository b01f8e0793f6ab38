//! The capability set jobscale consumes from the remote orchestration API.
//!
//! Implementations talk to a real cluster or, in `jobscale-state`, to an
//! embedded store. Every call may block on I/O; callers wrap them with
//! their own cancellation.

use async_trait::async_trait;
use thiserror::Error;

use crate::labels::LabelSelector;
use crate::types::{JobInstance, OwnerReference, ScaleTarget};

/// API group/version recorded on owner references to a target.
pub const TARGET_API_VERSION: &str = "keda.sh/v1alpha1";

/// Kind recorded on owner references to a target.
pub const TARGET_KIND: &str = "ScaledJob";

/// Errors returned by a remote client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid object: {0}")]
    Invalid(String),

    #[error("object {child} is already owned by {owner}")]
    AlreadyOwned { child: String, owner: String },

    #[error("remote unavailable: {0}")]
    Unavailable(String),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Remote operations on job instances and scale targets.
#[async_trait]
pub trait JobClient: Send + Sync {
    /// All jobs in `namespace` whose labels satisfy `selector`.
    async fn list_jobs(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> ClientResult<Vec<JobInstance>>;

    /// Submit a new job. The remote system assigns its final name when
    /// only `generate_name` is set.
    async fn create_job(&self, job: &JobInstance) -> ClientResult<()>;

    async fn delete_job(&self, job: &JobInstance) -> ClientResult<()>;

    /// Persist the status subresource of a target.
    async fn update_target_status(&self, target: &ScaleTarget) -> ClientResult<()>;

    /// Record `owner` as the controlling owner of `child`.
    fn set_owner_reference(
        &self,
        owner: &ScaleTarget,
        child: &mut JobInstance,
    ) -> ClientResult<()> {
        set_controller_reference(owner, child)
    }
}

/// Controller-reference semantics shared by all clients.
///
/// Cross-namespace ownership is rejected, as is taking over a child that
/// another controller already owns. An existing reference to the same
/// owner is replaced.
pub fn set_controller_reference(
    owner: &ScaleTarget,
    child: &mut JobInstance,
) -> ClientResult<()> {
    let meta = &owner.metadata;
    if meta.uid.is_empty() {
        return Err(ClientError::Invalid(format!(
            "owner {} has no uid",
            meta.key()
        )));
    }
    if meta.namespace != child.metadata.namespace {
        return Err(ClientError::Invalid(format!(
            "cross-namespace owner reference: owner in {:?}, child in {:?}",
            meta.namespace, child.metadata.namespace
        )));
    }
    if let Some(existing) = child.metadata.controller_ref()
        && existing.uid != meta.uid
    {
        return Err(ClientError::AlreadyOwned {
            child: child.metadata.key(),
            owner: format!("{}/{}", existing.kind, existing.name),
        });
    }

    let reference = OwnerReference {
        api_version: TARGET_API_VERSION.to_string(),
        kind: TARGET_KIND.to_string(),
        name: meta.name.clone(),
        uid: meta.uid.clone(),
        controller: true,
        block_owner_deletion: true,
    };
    let refs = &mut child.metadata.owner_references;
    match refs.iter_mut().find(|r| r.uid == reference.uid) {
        Some(slot) => *slot = reference,
        None => refs.push(reference),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObjectMeta;

    fn owner(uid: &str) -> ScaleTarget {
        ScaleTarget {
            metadata: ObjectMeta {
                name: "worker".to_string(),
                namespace: "batch".to_string(),
                uid: uid.to_string(),
                ..ObjectMeta::default()
            },
            ..ScaleTarget::default()
        }
    }

    fn child(namespace: &str) -> JobInstance {
        JobInstance {
            metadata: ObjectMeta {
                generate_name: Some("worker-".to_string()),
                namespace: namespace.to_string(),
                ..ObjectMeta::default()
            },
            ..JobInstance::default()
        }
    }

    #[test]
    fn attaches_controller_reference() {
        let mut job = child("batch");
        set_controller_reference(&owner("u-1"), &mut job).unwrap();

        let r = job.metadata.controller_ref().unwrap();
        assert_eq!(r.name, "worker");
        assert_eq!(r.uid, "u-1");
        assert_eq!(r.kind, TARGET_KIND);
        assert!(r.block_owner_deletion);
    }

    #[test]
    fn setting_twice_does_not_duplicate() {
        let mut job = child("batch");
        set_controller_reference(&owner("u-1"), &mut job).unwrap();
        set_controller_reference(&owner("u-1"), &mut job).unwrap();
        assert_eq!(job.metadata.owner_references.len(), 1);
    }

    #[test]
    fn rejects_owner_without_uid() {
        let mut job = child("batch");
        let err = set_controller_reference(&owner(""), &mut job).unwrap_err();
        assert!(matches!(err, ClientError::Invalid(_)));
        assert!(job.metadata.owner_references.is_empty());
    }

    #[test]
    fn rejects_cross_namespace_owner() {
        let mut job = child("other");
        let err = set_controller_reference(&owner("u-1"), &mut job).unwrap_err();
        assert!(matches!(err, ClientError::Invalid(_)));
    }

    #[test]
    fn rejects_second_controller() {
        let mut job = child("batch");
        set_controller_reference(&owner("u-1"), &mut job).unwrap();
        let err = set_controller_reference(&owner("u-2"), &mut job).unwrap_err();
        assert!(matches!(err, ClientError::AlreadyOwned { .. }));
    }
}
