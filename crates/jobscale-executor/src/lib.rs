//! jobscale-executor — job creation and history cleanup for scale targets.
//!
//! Given a desired job count and a ceiling on concurrently running jobs,
//! the executor decides how many new jobs to launch for a target, and on
//! every invocation prunes finished jobs beyond the target's history
//! limits.
//!
//! # Components
//!
//! - **`inventory`** — list a target's jobs by ownership label, classify
//!   them running / completed / failed
//! - **`planner`** — headroom under the ceiling and how much of the
//!   desired count to create
//! - **`factory`** — build jobs from the template and create them
//!   (best effort, one call per job)
//! - **`pruner`** — delete the oldest finished jobs beyond each history
//!   limit (stops at the first failed delete)
//! - **`executor`** — `ScaleExecutor::request_job_scale`, sequencing the
//!   above per invocation
//!
//! All state is re-read from the remote system on each call. Remote calls
//! honor a [`CancelSignal`].

pub mod cancel;
pub mod error;
pub mod executor;
pub mod factory;
pub mod inventory;
pub mod planner;
pub mod pruner;

#[cfg(test)]
mod testing;

pub use cancel::{CancelSignal, never_cancelled};
pub use error::{ScaleError, ScaleResult};
pub use executor::{ScaleExecutor, ScaleReport};
pub use factory::{CreateReport, InstanceFactory};
pub use inventory::{FinishedJobs, JobCounts};
pub use pruner::{HistoryLimits, PruneReport};
