//! The dequeue loop.
//!
//! One loop runs per worker process; a claimed job is run synchronously, so
//! each process handles at most one job at a time. Concurrency comes from
//! running many processes against the same table.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::{JobQueue, JobRunner, ShutdownFlag};

/// How long to wait between polls when no job was available.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Granularity at which the idle sleep re-checks the shutdown flag.
const SHUTDOWN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Whether the loop polls forever or performs a single iteration.
///
/// Single-shot is for tests and cron-triggered invocations; it exits after
/// one claim-and-run or one empty poll, without sleeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Continuous,
    SingleShot,
}

/// Claims one job at a time and runs it to completion.
pub struct DequeueLoop {
    queue: Arc<dyn JobQueue>,
    runner: JobRunner,
    shutdown: ShutdownFlag,
    mode: RunMode,
}

impl DequeueLoop {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        runner: JobRunner,
        shutdown: ShutdownFlag,
        mode: RunMode,
    ) -> Self {
        Self {
            queue,
            runner,
            shutdown,
            mode,
        }
    }

    /// Run until the shutdown flag trips, or for exactly one iteration in
    /// single-shot mode.
    ///
    /// The flag is only checked between iterations, never inside a claim or
    /// a running job.
    pub async fn run(&self) {
        info!(mode = ?self.mode, "Dequeue loop started");

        while self.shutdown.is_alive() {
            match self.queue.claim_next().await {
                Ok(Some(job)) => {
                    info!(
                        job_id = %job.id,
                        project_id = %job.project_id,
                        job_type = %job.job_type,
                        "Claimed job"
                    );
                    // Dispatch and handler failures are logged and absorbed
                    // here; the loop itself must keep polling.
                    if let Err(e) = self.runner.run(&job).await {
                        error!(job_id = %job.id, error = %e, "Job run failed");
                    }
                    // A job was available: poll again immediately.
                }
                Ok(None) => {
                    if self.mode == RunMode::Continuous {
                        self.idle_sleep().await;
                    }
                }
                Err(e) => {
                    // Transaction aborted, nothing was claimed. Retry on the
                    // next iteration.
                    warn!(error = %e, "Claim attempt failed");
                    if self.mode == RunMode::Continuous {
                        self.idle_sleep().await;
                    }
                }
            }

            if self.mode == RunMode::SingleShot {
                break;
            }
        }

        info!("Dequeue loop stopped");
    }

    /// Sleep the poll interval in slices, waking early on shutdown.
    async fn idle_sleep(&self) {
        let slices = POLL_INTERVAL.as_secs() / SHUTDOWN_CHECK_INTERVAL.as_secs();
        for _ in 0..slices {
            if self.shutdown.is_shutdown() {
                return;
            }
            sleep(SHUTDOWN_CHECK_INTERVAL).await;
        }
    }
}
