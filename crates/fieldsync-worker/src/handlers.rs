//! Container-backed handlers, one per job type.
//!
//! Each handler is a thin image configuration over the shared harness; the
//! actual packaging / delta / projectfile logic lives in the worker images.

use std::sync::Arc;

use async_trait::async_trait;
use fieldsync_core::{Error, JobHandler, JobId, Result};
use fieldsync_db::{JobRecord, JobRepo};

use crate::container::ContainerRunner;
use crate::run::{JobRun, JobStep};

const PACKAGE_IMAGE: &str = "fieldsync/worker-package:latest";
const DELTA_APPLY_IMAGE: &str = "fieldsync/worker-deltas:latest";
const PROCESS_PROJECTFILE_IMAGE: &str = "fieldsync/worker-projectfile:latest";

/// A handler that runs its job type's worker image to completion.
pub struct ContainerHandler {
    name: &'static str,
    run: JobRun,
}

impl ContainerHandler {
    pub fn package(repo: Arc<dyn JobRepo>, containers: Arc<ContainerRunner>) -> Self {
        Self::from_image("package", PACKAGE_IMAGE, repo, containers)
    }

    pub fn delta_apply(repo: Arc<dyn JobRepo>, containers: Arc<ContainerRunner>) -> Self {
        Self::from_image("delta_apply", DELTA_APPLY_IMAGE, repo, containers)
    }

    pub fn process_projectfile(repo: Arc<dyn JobRepo>, containers: Arc<ContainerRunner>) -> Self {
        Self::from_image(
            "process_projectfile",
            PROCESS_PROJECTFILE_IMAGE,
            repo,
            containers,
        )
    }

    fn from_image(
        name: &'static str,
        image: &'static str,
        repo: Arc<dyn JobRepo>,
        containers: Arc<ContainerRunner>,
    ) -> Self {
        let step = Arc::new(ContainerStep { image, containers });
        Self {
            name,
            run: JobRun::new(repo, step),
        }
    }
}

#[async_trait]
impl JobHandler for ContainerHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, job_id: JobId) -> Result<()> {
        self.run.run(job_id).await
    }
}

struct ContainerStep {
    image: &'static str,
    containers: Arc<ContainerRunner>,
}

#[async_trait]
impl JobStep for ContainerStep {
    async fn process(&self, job: &JobRecord) -> Result<Option<String>> {
        let container_name = format!("fieldsync-job-{}", job.id);
        let env = vec![
            format!("FIELDSYNC_JOB_ID={}", job.id),
            format!("FIELDSYNC_PROJECT_ID={}", job.project_id),
        ];

        let outcome = self
            .containers
            .run_to_completion(&container_name, self.image, env)
            .await?;

        if outcome.success() {
            Ok(Some(outcome.output))
        } else {
            Err(Error::ExecutionFailed(format!(
                "worker exited with code {}: {}",
                outcome.exit_code,
                outcome.output.trim_end()
            )))
        }
    }
}
