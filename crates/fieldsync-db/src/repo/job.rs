//! Job repository.
//!
//! The repository covers the interfaces the surrounding application uses
//! (enqueue, status reads) and the transitions the worker harness performs
//! (started, finished, failed). The pending -> queued claim is deliberately
//! NOT here: it lives in the scheduler, inside the claim transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldsync_core::{JobId, JobType, ProjectId};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::{DbError, DbResult};

/// A job row as stored in the database.
///
/// `job_type` and `status` stay text here and parse into their enums at the
/// point of use, so one malformed row cannot wedge a whole query.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobRecord {
    pub id: uuid::Uuid,
    pub project_id: uuid::Uuid,
    pub job_type: String,
    pub status: String,
    pub output: Option<String>,
    pub feedback: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait JobRepo: Send + Sync {
    /// Insert a new pending job.
    async fn enqueue(&self, project_id: ProjectId, job_type: JobType) -> DbResult<JobRecord>;

    async fn get(&self, id: JobId) -> DbResult<JobRecord>;

    /// All jobs of a project, oldest first.
    async fn list_by_project(&self, project_id: ProjectId) -> DbResult<Vec<JobRecord>>;

    /// Transition a queued job to started.
    async fn mark_started(&self, id: JobId) -> DbResult<JobRecord>;

    /// Transition a started job to finished, persisting captured output.
    async fn mark_finished(&self, id: JobId, output: Option<&str>) -> DbResult<JobRecord>;

    /// Transition a started job to failed, persisting the error text.
    async fn mark_failed(&self, id: JobId, output: Option<&str>) -> DbResult<JobRecord>;
}

/// PostgreSQL implementation of JobRepo.
pub struct PgJobRepo {
    pool: PgPool,
}

impl PgJobRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepo for PgJobRepo {
    async fn enqueue(&self, project_id: ProjectId, job_type: JobType) -> DbResult<JobRecord> {
        let record = sqlx::query_as::<_, JobRecord>(
            r#"
            INSERT INTO jobs (id, project_id, job_type, status, created_at, updated_at)
            VALUES ($1, $2, $3, 'pending', NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(JobId::new().as_uuid())
        .bind(project_id.as_uuid())
        .bind(job_type.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn get(&self, id: JobId) -> DbResult<JobRecord> {
        let record = sqlx::query_as::<_, JobRecord>("SELECT * FROM jobs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("job {}", id)))?;
        Ok(record)
    }

    async fn list_by_project(&self, project_id: ProjectId) -> DbResult<Vec<JobRecord>> {
        let records = sqlx::query_as::<_, JobRecord>(
            "SELECT * FROM jobs WHERE project_id = $1 ORDER BY created_at, id",
        )
        .bind(project_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn mark_started(&self, id: JobId) -> DbResult<JobRecord> {
        // The status guard keeps the lifecycle forward-only even if two
        // processes somehow raced on the same job.
        let record = sqlx::query_as::<_, JobRecord>(
            r#"
            UPDATE jobs
            SET status = 'started', started_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'queued'
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::StaleStatus(format!("job {} is not queued", id)))?;
        Ok(record)
    }

    async fn mark_finished(&self, id: JobId, output: Option<&str>) -> DbResult<JobRecord> {
        let record = sqlx::query_as::<_, JobRecord>(
            r#"
            UPDATE jobs
            SET status = 'finished', output = $2, finished_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'started'
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(output)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::StaleStatus(format!("job {} is not started", id)))?;
        Ok(record)
    }

    async fn mark_failed(&self, id: JobId, output: Option<&str>) -> DbResult<JobRecord> {
        let record = sqlx::query_as::<_, JobRecord>(
            r#"
            UPDATE jobs
            SET status = 'failed', output = $2, finished_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'started'
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(output)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::StaleStatus(format!("job {} is not started", id)))?;
        Ok(record)
    }
}
