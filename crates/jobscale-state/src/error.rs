//! Error types for the jobscale job store.

use jobscale_core::ClientError;
use thiserror::Error;

/// Result type alias for job store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during job store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid object: {0}")]
    Invalid(String),
}

impl From<StateError> for ClientError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotFound(key) => ClientError::NotFound(key),
            StateError::AlreadyExists(key) => ClientError::AlreadyExists(key),
            StateError::Invalid(msg) => ClientError::Invalid(msg),
            other => ClientError::Backend(other.to_string()),
        }
    }
}
