//! StateStore — redb-backed job store.
//!
//! Plays the remote orchestration API for standalone runs and tests:
//! targets and jobs are JSON-serialized into redb's `&[u8]` value
//! columns, names are generated server-side from `generate_name`, and
//! deleting a target cascades to the jobs it controls. Supports both
//! on-disk and in-memory backends.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use redb::{AccessGuard, Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use jobscale_core::{JobInstance, JobStatus, LabelSelector, ScaleTarget, ScaleTargetStatus};

use crate::error::{StateError, StateResult};
use crate::tables::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

type Table = TableDefinition<'static, &'static str, &'static [u8]>;

/// Characters used for generated name suffixes (no vowels, no look-alikes).
const SUFFIX_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";
const SUFFIX_LEN: usize = 5;
const MAX_NAME_ATTEMPTS: usize = 8;

/// Thread-safe job store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "job store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory job store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(TARGETS).map_err(map_err!(Table))?;
        txn.open_table(JOBS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Targets ────────────────────────────────────────────────────

    /// Insert or update a target's metadata and spec.
    ///
    /// A new target gets a fresh uid. An existing one keeps its uid and
    /// status, so re-applying a manifest never resets `last_active_time`.
    pub fn apply_target(&self, target: &ScaleTarget) -> StateResult<ScaleTarget> {
        validate_namespace(&target.metadata.namespace)?;
        validate_name(&target.metadata.name)?;
        let key = target.metadata.key();
        let stored = self.modify(TARGETS, &key, |existing: Option<ScaleTarget>| {
            let mut stored = target.clone();
            match existing {
                Some(existing) => {
                    stored.metadata.uid = existing.metadata.uid;
                    stored.metadata.creation_timestamp = existing.metadata.creation_timestamp;
                    stored.status = existing.status;
                }
                None => {
                    stored.metadata.uid = uuid::Uuid::new_v4().to_string();
                    stored.metadata.creation_timestamp = Some(Utc::now());
                }
            }
            Ok(stored)
        })?;
        debug!(%key, uid = %stored.metadata.uid, "target applied");
        Ok(stored)
    }

    /// Get a target by `{namespace}/{name}` key.
    pub fn get_target(&self, key: &str) -> StateResult<Option<ScaleTarget>> {
        self.get_value(TARGETS, key)
    }

    pub fn list_targets(&self) -> StateResult<Vec<ScaleTarget>> {
        self.scan(TARGETS, "")
    }

    /// Replace only the status of a stored target.
    pub fn update_target_status(&self, key: &str, status: &ScaleTargetStatus) -> StateResult<()> {
        self.modify(TARGETS, key, |existing: Option<ScaleTarget>| {
            let mut stored = existing.ok_or_else(|| StateError::NotFound(key.to_string()))?;
            stored.status = status.clone();
            Ok(stored)
        })?;
        debug!(%key, "target status updated");
        Ok(())
    }

    /// Delete a target and every job it controls. Returns false if the
    /// target did not exist.
    pub fn delete_target(&self, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let cascaded;
        {
            let mut targets = txn.open_table(TARGETS).map_err(map_err!(Table))?;
            let Some(target) = decode::<ScaleTarget>(targets.get(key).map_err(map_err!(Read))?)?
            else {
                return Ok(false);
            };
            let uid = target.metadata.uid;

            let mut jobs = txn.open_table(JOBS).map_err(map_err!(Table))?;
            let mut owned = Vec::new();
            for entry in jobs.iter().map_err(map_err!(Read))? {
                let (_, value) = entry.map_err(map_err!(Read))?;
                let job: JobInstance =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                if job.metadata.namespace == target.metadata.namespace
                    && job.metadata.controller_ref().is_some_and(|r| r.uid == uid)
                {
                    owned.push(job.metadata.key());
                }
            }
            for job_key in &owned {
                jobs.remove(job_key.as_str()).map_err(map_err!(Write))?;
            }
            targets.remove(key).map_err(map_err!(Write))?;
            cascaded = owned.len();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, cascaded, "target deleted");
        Ok(true)
    }

    // ── Jobs ───────────────────────────────────────────────────────

    /// Create a job, generating its name from `generate_name` when the
    /// name is empty. Returns the job as stored.
    ///
    /// The existence check and the insert share one write transaction, so
    /// concurrent creates of the same name cannot both succeed.
    pub fn create_job(&self, job: &JobInstance) -> StateResult<JobInstance> {
        let mut stored = job.clone();
        let namespace = stored.metadata.namespace.clone();
        validate_namespace(&namespace)?;
        if stored.metadata.name.is_empty() && stored.metadata.generate_name.is_none() {
            return Err(StateError::Invalid("job needs a name or generate_name".to_string()));
        }
        if !stored.metadata.name.is_empty() {
            validate_name(&stored.metadata.name)?;
        }

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(JOBS).map_err(map_err!(Table))?;
            if let Some(prefix) = stored.metadata.generate_name.as_deref()
                && stored.metadata.name.is_empty()
            {
                stored.metadata.name = unique_name(&table, &namespace, prefix)?;
            } else if table
                .get(stored.metadata.key().as_str())
                .map_err(map_err!(Read))?
                .is_some()
            {
                return Err(StateError::AlreadyExists(stored.metadata.key()));
            }

            stored.metadata.uid = uuid::Uuid::new_v4().to_string();
            stored.metadata.creation_timestamp = Some(Utc::now());
            stored.status = JobStatus::default();

            let bytes = serde_json::to_vec(&stored).map_err(map_err!(Serialize))?;
            table
                .insert(stored.metadata.key().as_str(), bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(key = %stored.metadata.key(), "job created");
        Ok(stored)
    }

    pub fn get_job(&self, key: &str) -> StateResult<Option<JobInstance>> {
        self.get_value(JOBS, key)
    }

    /// All jobs in `namespace` whose labels satisfy `selector`.
    pub fn list_jobs(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> StateResult<Vec<JobInstance>> {
        let jobs: Vec<JobInstance> = self.scan(JOBS, &format!("{namespace}/"))?;
        Ok(jobs
            .into_iter()
            .filter(|job| job.metadata.namespace == namespace)
            .filter(|job| selector.matches(&job.metadata.labels))
            .collect())
    }

    /// Delete a job by key.
    pub fn delete_job(&self, key: &str) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(JOBS).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        if !existed {
            return Err(StateError::NotFound(key.to_string()));
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "job deleted");
        Ok(())
    }

    /// Overwrite a job's status. This is the hook through which the
    /// outside world reports a job running, completing, or failing.
    pub fn put_job_status(&self, key: &str, status: &JobStatus) -> StateResult<()> {
        self.modify(JOBS, key, |existing: Option<JobInstance>| {
            let mut stored = existing.ok_or_else(|| StateError::NotFound(key.to_string()))?;
            stored.status = status.clone();
            Ok(stored)
        })?;
        Ok(())
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Read-modify-write of one entry inside a single write transaction.
    /// An error from `f` aborts the transaction.
    fn modify<T, F>(&self, def: Table, key: &str, f: F) -> StateResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> StateResult<T>,
    {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let stored;
        {
            let mut table = txn.open_table(def).map_err(map_err!(Table))?;
            let current = decode(table.get(key).map_err(map_err!(Read))?)?;
            stored = f(current)?;
            let bytes = serde_json::to_vec(&stored).map_err(map_err!(Serialize))?;
            table
                .insert(key, bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(stored)
    }

    fn get_value<T: DeserializeOwned>(&self, def: Table, key: &str) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(def).map_err(map_err!(Table))?;
        decode(table.get(key).map_err(map_err!(Read))?)
    }

    fn scan<T: DeserializeOwned>(&self, def: Table, prefix: &str) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(def).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(prefix) {
                let item = serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(item);
            }
        }
        Ok(results)
    }
}

fn decode<T: DeserializeOwned>(
    guard: Option<AccessGuard<'_, &'static [u8]>>,
) -> StateResult<Option<T>> {
    guard
        .map(|g| serde_json::from_slice(g.value()).map_err(map_err!(Deserialize)))
        .transpose()
}

fn unique_name(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    namespace: &str,
    prefix: &str,
) -> StateResult<String> {
    for _ in 0..MAX_NAME_ATTEMPTS {
        let name = format!("{prefix}{}", random_suffix());
        let key = format!("{namespace}/{name}");
        if table.get(key.as_str()).map_err(map_err!(Read))?.is_none() {
            return Ok(name);
        }
    }
    Err(StateError::AlreadyExists(format!(
        "{namespace}/{prefix}* (name generation exhausted)"
    )))
}

fn random_suffix() -> String {
    uuid::Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(SUFFIX_LEN)
        .map(|b| SUFFIX_ALPHABET[*b as usize % SUFFIX_ALPHABET.len()] as char)
        .collect()
}

fn validate_name(name: &str) -> StateResult<()> {
    if name.is_empty() || name.contains('/') {
        return Err(StateError::Invalid(format!("invalid object name {name:?}")));
    }
    Ok(())
}

fn validate_namespace(namespace: &str) -> StateResult<()> {
    if namespace.is_empty() || namespace.contains('/') {
        return Err(StateError::Invalid(format!("invalid namespace {namespace:?}")));
    }
    Ok(())
}
