//! Label schema stamped onto job instances, and label selectors.
//!
//! `scaledjob = <target name>` is the only label used to correlate a job
//! with its target. The `app.kubernetes.io/*` labels are descriptive.

use std::collections::BTreeMap;

/// Ownership label; its value is the owning target's name.
pub const SCALED_JOB_LABEL: &str = "scaledjob";

pub const APP_NAME_LABEL: &str = "app.kubernetes.io/name";
pub const APP_VERSION_LABEL: &str = "app.kubernetes.io/version";
pub const APP_PART_OF_LABEL: &str = "app.kubernetes.io/part-of";
pub const APP_MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Default value of the managed-by label.
pub const DEFAULT_MANAGED_BY: &str = "jobscale-operator";

/// Equality-based label selector: every pair must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector matching every job owned by the named target.
    pub fn for_target(target_name: &str) -> Self {
        Self::new().with(SCALED_JOB_LABEL, target_name)
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.match_labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v))
    }

    pub fn match_labels(&self) -> &BTreeMap<String, String> {
        &self.match_labels
    }
}

impl std::fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .match_labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{}", parts.join(","))
    }
}
