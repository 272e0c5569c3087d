//! Error types for FieldSync.

use thiserror::Error;

use crate::JobStatus;

#[derive(Debug, Error)]
pub enum Error {
    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("unknown job type: {0}")]
    UnknownJobType(String),

    #[error("unknown job status: {0}")]
    UnknownJobStatus(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
