//! Capacity planning: how many new jobs fit under the ceiling.

/// Headroom left under `ceiling` once `running` jobs are accounted for.
///
/// Never negative: a target already over its ceiling gets zero.
pub fn effective_ceiling(ceiling: i64, running: i64) -> i64 {
    ceiling.saturating_sub(running).max(0)
}

/// Number of jobs to create this invocation.
pub fn jobs_to_create(desired: i64, effective_ceiling: i64) -> i64 {
    desired.min(effective_ceiling).max(0)
}
