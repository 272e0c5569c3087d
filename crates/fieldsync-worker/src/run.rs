//! Shared execution harness.
//!
//! Every handler drives a claimed job through the same lifecycle: re-fetch,
//! mark started, do the type-specific work, write the terminal status with
//! whatever output was captured.

use std::sync::Arc;

use async_trait::async_trait;
use fieldsync_core::{Error, JobId, JobStatus, Result};
use fieldsync_db::{DbError, JobRecord, JobRepo};
use tracing::{error, info};

/// The type-specific unit of work executed by the harness.
#[async_trait]
pub trait JobStep: Send + Sync {
    /// Perform the work for one started job, returning captured output.
    async fn process(&self, job: &JobRecord) -> Result<Option<String>>;
}

/// Drives a claimed job from `queued` to a terminal status around a step.
pub struct JobRun {
    repo: Arc<dyn JobRepo>,
    step: Arc<dyn JobStep>,
}

impl JobRun {
    pub fn new(repo: Arc<dyn JobRepo>, step: Arc<dyn JobStep>) -> Self {
        Self { repo, step }
    }

    /// Execute one claimed job to completion.
    ///
    /// The job is re-fetched by id: the scheduler's in-memory copy may be
    /// stale by the time the handoff happens. A step failure is recorded on
    /// the job as `failed` and is not an error of the harness itself.
    pub async fn run(&self, job_id: JobId) -> Result<()> {
        let job = self.repo.get(job_id).await.map_err(store)?;

        let status: JobStatus = job.status.parse()?;
        if status != JobStatus::Queued {
            return Err(Error::InvalidTransition {
                from: status,
                to: JobStatus::Started,
            });
        }

        let job = self.repo.mark_started(job_id).await.map_err(store)?;
        info!(job_id = %job.id, job_type = %job.job_type, "Job started");

        match self.step.process(&job).await {
            Ok(output) => {
                self.repo
                    .mark_finished(job_id, output.as_deref())
                    .await
                    .map_err(store)?;
                info!(job_id = %job.id, "Job finished");
            }
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Job failed");
                // If this write fails too the job stays `started` and its
                // project stays blocked until an operator intervenes.
                self.repo
                    .mark_failed(job_id, Some(&e.to_string()))
                    .await
                    .map_err(store)?;
            }
        }

        Ok(())
    }
}

fn store(err: DbError) -> Error {
    match err {
        DbError::NotFound(what) => Error::JobNotFound(what),
        other => Error::Store(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fieldsync_core::{JobType, ProjectId};
    use fieldsync_db::DbResult;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory JobRepo mirroring the Pg implementation's status guards.
    #[derive(Default)]
    struct InMemoryRepo {
        jobs: Mutex<HashMap<uuid::Uuid, JobRecord>>,
    }

    impl InMemoryRepo {
        fn insert(&self, status: &str) -> JobId {
            let now = Utc::now();
            let id = uuid::Uuid::now_v7();
            let record = JobRecord {
                id,
                project_id: uuid::Uuid::now_v7(),
                job_type: "package".to_string(),
                status: status.to_string(),
                output: None,
                feedback: None,
                created_at: now,
                updated_at: now,
                started_at: None,
                finished_at: None,
            };
            self.jobs.lock().unwrap().insert(id, record);
            JobId::from_uuid(id)
        }

        fn status_of(&self, id: JobId) -> String {
            self.jobs.lock().unwrap()[id.as_uuid()].status.clone()
        }

        fn output_of(&self, id: JobId) -> Option<String> {
            self.jobs.lock().unwrap()[id.as_uuid()].output.clone()
        }

        fn transition(
            &self,
            id: JobId,
            expected: &str,
            next: &str,
            output: Option<&str>,
        ) -> DbResult<JobRecord> {
            let mut jobs = self.jobs.lock().unwrap();
            let record = jobs
                .get_mut(id.as_uuid())
                .ok_or_else(|| DbError::NotFound(format!("job {}", id)))?;
            if record.status != expected {
                return Err(DbError::StaleStatus(format!(
                    "job {} is not {}",
                    id, expected
                )));
            }
            record.status = next.to_string();
            record.updated_at = Utc::now();
            if let Some(output) = output {
                record.output = Some(output.to_string());
            }
            Ok(record.clone())
        }
    }

    #[async_trait]
    impl JobRepo for InMemoryRepo {
        async fn enqueue(&self, project_id: ProjectId, job_type: JobType) -> DbResult<JobRecord> {
            let now = Utc::now();
            let record = JobRecord {
                id: uuid::Uuid::now_v7(),
                project_id: *project_id.as_uuid(),
                job_type: job_type.as_str().to_string(),
                status: "pending".to_string(),
                output: None,
                feedback: None,
                created_at: now,
                updated_at: now,
                started_at: None,
                finished_at: None,
            };
            self.jobs.lock().unwrap().insert(record.id, record.clone());
            Ok(record)
        }

        async fn get(&self, id: JobId) -> DbResult<JobRecord> {
            self.jobs
                .lock()
                .unwrap()
                .get(id.as_uuid())
                .cloned()
                .ok_or_else(|| DbError::NotFound(format!("job {}", id)))
        }

        async fn list_by_project(&self, project_id: ProjectId) -> DbResult<Vec<JobRecord>> {
            let mut records: Vec<_> = self
                .jobs
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.project_id == *project_id.as_uuid())
                .cloned()
                .collect();
            records.sort_by_key(|r| (r.created_at, r.id));
            Ok(records)
        }

        async fn mark_started(&self, id: JobId) -> DbResult<JobRecord> {
            self.transition(id, "queued", "started", None)
        }

        async fn mark_finished(&self, id: JobId, output: Option<&str>) -> DbResult<JobRecord> {
            self.transition(id, "started", "finished", output)
        }

        async fn mark_failed(&self, id: JobId, output: Option<&str>) -> DbResult<JobRecord> {
            self.transition(id, "started", "failed", output)
        }
    }

    struct FixedStep(Result<Option<String>>);

    #[async_trait]
    impl JobStep for FixedStep {
        async fn process(&self, _job: &JobRecord) -> Result<Option<String>> {
            match &self.0 {
                Ok(output) => Ok(output.clone()),
                Err(e) => Err(Error::ExecutionFailed(e.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_queued_job_runs_to_finished() {
        let repo = Arc::new(InMemoryRepo::default());
        let id = repo.insert("queued");
        let run = JobRun::new(
            repo.clone(),
            Arc::new(FixedStep(Ok(Some("packaged 14 layers".to_string())))),
        );

        run.run(id).await.unwrap();

        assert_eq!(repo.status_of(id), "finished");
        assert_eq!(repo.output_of(id).unwrap(), "packaged 14 layers");
    }

    #[tokio::test]
    async fn test_step_failure_marks_job_failed() {
        let repo = Arc::new(InMemoryRepo::default());
        let id = repo.insert("queued");
        let run = JobRun::new(
            repo.clone(),
            Arc::new(FixedStep(Err(Error::ExecutionFailed(
                "worker exited with code 2".to_string(),
            )))),
        );

        // The failure lands on the job, not on the harness result.
        run.run(id).await.unwrap();

        assert_eq!(repo.status_of(id), "failed");
        assert!(repo.output_of(id).unwrap().contains("exited with code 2"));
    }

    #[tokio::test]
    async fn test_job_not_queued_is_rejected_untouched() {
        let repo = Arc::new(InMemoryRepo::default());
        let id = repo.insert("pending");
        let run = JobRun::new(repo.clone(), Arc::new(FixedStep(Ok(None))));

        let err = run.run(id).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: JobStatus::Pending,
                to: JobStatus::Started,
            }
        ));
        assert_eq!(repo.status_of(id), "pending");
    }

    #[tokio::test]
    async fn test_missing_job_is_an_error() {
        let repo = Arc::new(InMemoryRepo::default());
        let run = JobRun::new(repo, Arc::new(FixedStep(Ok(None))));

        let err = run.run(JobId::new()).await.unwrap_err();
        assert!(matches!(err, Error::JobNotFound(_)));
    }
}
