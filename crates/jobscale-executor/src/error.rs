//! Executor error types.

use jobscale_core::ClientError;
use thiserror::Error;

/// Errors surfaced by the executor's fallible steps.
#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("remote call failed: {0}")]
    Client(#[from] ClientError),

    #[error("failed to delete job {job}: {source}")]
    Delete {
        job: String,
        #[source]
        source: ClientError,
    },

    #[error("invocation cancelled")]
    Cancelled,
}

impl ScaleError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScaleError::Cancelled)
    }
}

pub type ScaleResult<T> = Result<T, ScaleError>;
