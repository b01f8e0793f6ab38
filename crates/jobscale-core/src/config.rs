//! jobscale.toml configuration parser.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::labels::DEFAULT_MANAGED_BY;
use crate::types::{DEFAULT_FAILED_JOBS_HISTORY_LIMIT, DEFAULT_SUCCESSFUL_JOBS_HISTORY_LIMIT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobscaleConfig {
    pub executor: ExecutorConfig,
    pub daemon: DaemonConfig,
}

/// Knobs for the scale executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Applied when a target leaves its successful limit unset.
    pub successful_jobs_history_limit: u32,
    /// Applied when a target leaves its failed limit unset.
    pub failed_jobs_history_limit: u32,
    /// Value of the `app.kubernetes.io/managed-by` label.
    pub managed_by: String,
    pub on_list_failure: ListFailurePolicy,
}

/// What the running-count query does when listing jobs fails.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListFailurePolicy {
    /// Count zero running jobs and keep going. Under a list outage this
    /// can create up to the full ceiling on top of the jobs already
    /// running.
    #[default]
    AssumeNoneRunning,
    /// Skip creation for this invocation. Cleanup still runs.
    SkipScaling,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    pub data_dir: PathBuf,
    /// Seconds between invocations in `run` mode.
    pub interval_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            successful_jobs_history_limit: DEFAULT_SUCCESSFUL_JOBS_HISTORY_LIMIT,
            failed_jobs_history_limit: DEFAULT_FAILED_JOBS_HISTORY_LIMIT,
            managed_by: DEFAULT_MANAGED_BY.to_string(),
            on_list_failure: ListFailurePolicy::default(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/jobscale"),
            interval_secs: 30,
        }
    }
}

impl JobscaleConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = JobscaleConfig::parse("").unwrap();
        assert_eq!(config, JobscaleConfig::default());
        assert_eq!(config.executor.successful_jobs_history_limit, 100);
        assert_eq!(config.executor.failed_jobs_history_limit, 100);
        assert_eq!(config.executor.managed_by, "jobscale-operator");
        assert_eq!(
            config.executor.on_list_failure,
            ListFailurePolicy::AssumeNoneRunning
        );
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = JobscaleConfig::parse(
            r#"
[executor]
failed_jobs_history_limit = 3
on_list_failure = "skip_scaling"

[daemon]
interval_secs = 5
"#,
        )
        .unwrap();
        assert_eq!(config.executor.failed_jobs_history_limit, 3);
        assert_eq!(config.executor.successful_jobs_history_limit, 100);
        assert_eq!(config.executor.on_list_failure, ListFailurePolicy::SkipScaling);
        assert_eq!(config.daemon.interval_secs, 5);
        assert_eq!(config.daemon.data_dir, PathBuf::from("/var/lib/jobscale"));
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobscale.toml");
        let mut config = JobscaleConfig::default();
        config.executor.managed_by = "ops".to_string();
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        assert_eq!(JobscaleConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = JobscaleConfig::from_file(Path::new("/nonexistent/jobscale.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
