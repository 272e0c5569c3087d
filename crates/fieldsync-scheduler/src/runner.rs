//! Dispatches claimed jobs to their execution handlers.

use std::collections::HashMap;
use std::sync::Arc;

use fieldsync_core::{JobHandler, JobId, JobType};
use fieldsync_db::JobRecord;
use tracing::info;

use crate::SchedulerError;

/// Maps job types to execution handlers.
///
/// The registry is fixed at startup. A claimed job whose type is missing
/// here (or does not parse at all) fails dispatch; the caller logs it and
/// keeps polling.
pub struct JobRunner {
    handlers: HashMap<JobType, Arc<dyn JobHandler>>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(mut self, job_type: JobType, handler: Arc<dyn JobHandler>) -> Self {
        self.handlers.insert(job_type, handler);
        self
    }

    /// Dispatch a claimed job to its handler and drive it to completion.
    pub async fn run(&self, job: &JobRecord) -> Result<(), SchedulerError> {
        let job_type: JobType = job
            .job_type
            .parse()
            .map_err(|_| SchedulerError::UnimplementedJobType(job.job_type.clone()))?;

        let handler = self
            .handlers
            .get(&job_type)
            .ok_or_else(|| SchedulerError::UnimplementedJobType(job.job_type.clone()))?;

        info!(job_id = %job.id, job_type = %job_type, handler = handler.name(), "Dispatching job");
        handler.run(JobId::from_uuid(job.id)).await?;
        Ok(())
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use fieldsync_core::Result as CoreResult;
    use std::sync::Mutex;

    fn make_job(job_type: &str) -> JobRecord {
        let now = Utc::now();
        JobRecord {
            id: uuid::Uuid::now_v7(),
            project_id: uuid::Uuid::now_v7(),
            job_type: job_type.to_string(),
            status: "queued".to_string(),
            output: None,
            feedback: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    struct RecordingHandler {
        seen: Mutex<Vec<JobId>>,
    }

    impl RecordingHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl JobHandler for RecordingHandler {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn run(&self, job_id: JobId) -> CoreResult<()> {
            self.seen.lock().unwrap().push(job_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatches_to_matching_handler() {
        let package = RecordingHandler::new();
        let deltas = RecordingHandler::new();
        let runner = JobRunner::new()
            .register(JobType::Package, package.clone())
            .register(JobType::DeltaApply, deltas.clone());

        let job = make_job("delta_apply");
        runner.run(&job).await.unwrap();

        assert!(package.seen.lock().unwrap().is_empty());
        assert_eq!(
            deltas.seen.lock().unwrap().as_slice(),
            &[JobId::from_uuid(job.id)]
        );
    }

    #[tokio::test]
    async fn test_unknown_type_fails_dispatch() {
        let runner = JobRunner::new().register(JobType::Package, RecordingHandler::new());

        let err = runner.run(&make_job("vacuum")).await.unwrap_err();
        assert!(matches!(err, SchedulerError::UnimplementedJobType(t) if t == "vacuum"));
    }

    #[tokio::test]
    async fn test_unregistered_type_fails_dispatch() {
        let runner = JobRunner::new().register(JobType::Package, RecordingHandler::new());

        let err = runner.run(&make_job("delta_apply")).await.unwrap_err();
        assert!(matches!(err, SchedulerError::UnimplementedJobType(_)));
    }
}
