//! The dequeue daemon command.

use std::sync::Arc;

use anyhow::{Context, Result};
use fieldsync_core::JobType;
use fieldsync_db::{JobRepo, PgJobRepo, create_pool};
use fieldsync_scheduler::{
    DequeueLoop, JobRunner, PgJobQueue, RunMode, ShutdownFlag, listen_for_signals,
};
use fieldsync_worker::{ContainerHandler, ContainerRunner};
use tracing::{info, warn};

/// Run the dequeue loop against the configured database.
pub async fn run(database_url: &str, single_shot: bool) -> Result<()> {
    info!("Dequeue FieldSync jobs from the DB");

    let pool = create_pool(database_url)
        .await
        .context("Failed to connect to database")?;

    let repo: Arc<dyn JobRepo> = Arc::new(PgJobRepo::new(pool.clone()));
    let containers =
        Arc::new(ContainerRunner::new().context("Failed to connect to Docker daemon")?);

    let runner = JobRunner::new()
        .register(
            JobType::Package,
            Arc::new(ContainerHandler::package(repo.clone(), containers.clone())),
        )
        .register(
            JobType::DeltaApply,
            Arc::new(ContainerHandler::delta_apply(
                repo.clone(),
                containers.clone(),
            )),
        )
        .register(
            JobType::ProcessProjectfile,
            Arc::new(ContainerHandler::process_projectfile(repo, containers)),
        );

    let shutdown = ShutdownFlag::new();
    let signal_flag = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = listen_for_signals(signal_flag).await {
            warn!(error = %e, "Failed to install signal handlers");
        }
    });

    let mode = if single_shot {
        RunMode::SingleShot
    } else {
        RunMode::Continuous
    };

    DequeueLoop::new(Arc::new(PgJobQueue::new(pool)), runner, shutdown, mode)
        .run()
        .await;

    Ok(())
}
