//! The handler trait claimed jobs are dispatched to.

use async_trait::async_trait;

use crate::{JobId, Result};

/// A type-specific execution handler.
///
/// Handlers receive the id of a job in `queued` status and own everything
/// from there: the queued -> started transition, the work itself, and the
/// terminal status write. The scheduler's responsibility ends at dispatch.
///
/// New job types are added by extending [`crate::JobType`] and registering
/// another implementation, never by open-ended subclassing of existing
/// handlers.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Execute the job to completion.
    ///
    /// Implementations re-fetch the job by id rather than trusting any
    /// in-memory copy from the scheduler handoff.
    async fn run(&self, job_id: JobId) -> Result<()>;
}
