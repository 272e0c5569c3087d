//! Scheduler error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The claim transaction aborted; nothing was claimed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A claimed job's type has no registered handler. The job stays in
    /// whatever state it reached; an operator has to intervene.
    #[error("no handler for job type: {0}")]
    UnimplementedJobType(String),

    #[error("handler error: {0}")]
    Handler(#[from] fieldsync_core::Error),
}
