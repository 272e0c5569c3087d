//! The claim transaction.
//!
//! Concurrent dequeue processes race on the same candidate rows; SKIP LOCKED
//! makes the race non-blocking and the surrounding transaction makes the
//! busy-project computation and the status write atomic. No process ever
//! waits on a row another process is claiming, and no job is claimed twice.

use async_trait::async_trait;
use fieldsync_db::JobRecord;
use sqlx::PgPool;
use tracing::debug;

use crate::SchedulerError;

/// Source of claimable jobs.
///
/// The dequeue loop needs exactly one operation from the store; keeping it
/// behind a trait lets the loop run against an in-memory queue in tests.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Claim the next eligible pending job, transitioning it to `queued`.
    ///
    /// Returns `Ok(None)` when no pending job of a project-free project
    /// exists. Zero candidates while pending jobs exist is normal: another
    /// process claimed them first, or their projects are busy.
    async fn claim_next(&self) -> Result<Option<JobRecord>, SchedulerError>;
}

/// Job queue backed by PostgreSQL.
pub struct PgJobQueue {
    pool: PgPool,
}

impl PgJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn claim_next(&self) -> Result<Option<JobRecord>, SchedulerError> {
        let mut tx = self.pool.begin().await?;

        // Oldest pending job whose project has no queued or started job.
        // The busy-project subquery and the row lock evaluate inside the
        // same transaction; SKIP LOCKED drops rows a concurrent claim is
        // already holding instead of waiting on them.
        let candidate = sqlx::query_as::<_, JobRecord>(
            r#"
            SELECT * FROM jobs
            WHERE status = 'pending'
              AND project_id NOT IN (
                  SELECT project_id FROM jobs
                  WHERE status IN ('queued', 'started')
              )
            ORDER BY created_at, id
            FOR UPDATE SKIP LOCKED
            LIMIT 1
            "#,
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(job) = candidate else {
            tx.commit().await?;
            debug!("No eligible pending job");
            return Ok(None);
        };

        // Still inside the transaction that holds the row lock.
        let claimed = sqlx::query_as::<_, JobRecord>(
            r#"
            UPDATE jobs
            SET status = 'queued', updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(claimed))
    }
}
