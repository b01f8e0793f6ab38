//! jobscale-core — shared types for the jobscale workspace.
//!
//! Holds the resource model (`ScaleTarget`, `JobInstance`), the label
//! schema used to correlate jobs with their target, the `JobClient`
//! capability set the executor consumes, and `jobscale.toml` parsing.

pub mod client;
pub mod config;
pub mod labels;
pub mod types;

pub use client::{ClientError, ClientResult, JobClient};
pub use config::{ConfigError, ExecutorConfig, JobscaleConfig, ListFailurePolicy};
pub use labels::LabelSelector;
pub use types::*;
