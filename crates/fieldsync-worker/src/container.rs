//! Runs job work inside one-shot Docker containers.

use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use fieldsync_core::{Error, Result};
use futures::StreamExt;
use tracing::{debug, info, warn};

/// Outcome of a container run: exit code plus combined stdout/stderr.
#[derive(Debug)]
pub struct ContainerOutcome {
    pub exit_code: i64,
    pub output: String,
}

impl ContainerOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs worker images against the local Docker daemon.
pub struct ContainerRunner {
    docker: Docker,
}

impl ContainerRunner {
    /// Connect to the local Docker daemon.
    pub fn new() -> Result<Self> {
        let docker =
            Docker::connect_with_local_defaults().map_err(|e| Error::Internal(e.to_string()))?;
        Ok(Self { docker })
    }

    /// Create with a custom Docker client.
    pub fn with_client(docker: Docker) -> Self {
        Self { docker }
    }

    /// Run `image` to completion with the given environment and return its
    /// exit code and log output. The container is removed afterwards.
    pub async fn run_to_completion(
        &self,
        name: &str,
        image: &str,
        env: Vec<String>,
    ) -> Result<ContainerOutcome> {
        info!(image = %image, container = %name, "Pulling image");
        let create_image_options = CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        };

        let mut pull_stream = self
            .docker
            .create_image(Some(create_image_options), None, None);
        while let Some(result) = pull_stream.next().await {
            match result {
                Ok(progress) => {
                    if let Some(status) = progress.status {
                        debug!(status = %status, "Pull progress");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Pull warning");
                }
            }
        }

        let config = Config {
            image: Some(image.to_string()),
            env: Some(env),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(false),
            ..Default::default()
        };

        let create_options = CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        };

        self.docker
            .create_container(Some(create_options), config)
            .await
            .map_err(|e| Error::ExecutionFailed(format!("Failed to create container: {}", e)))?;

        self.docker
            .start_container(name, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| Error::ExecutionFailed(format!("Failed to start container: {}", e)))?;

        let wait_options = WaitContainerOptions {
            condition: "not-running",
        };

        let mut wait_stream = self.docker.wait_container(name, Some(wait_options));
        let mut exit_code = 0i64;
        while let Some(result) = wait_stream.next().await {
            match result {
                Ok(response) => exit_code = response.status_code,
                // Non-zero exits surface as a wait error carrying the code.
                Err(bollard::errors::Error::DockerContainerWaitError { code, .. }) => {
                    exit_code = code;
                }
                Err(e) => {
                    self.remove(name).await;
                    return Err(Error::ExecutionFailed(format!(
                        "Failed waiting for container: {}",
                        e
                    )));
                }
            }
        }

        let output = self.collect_logs(name).await;
        self.remove(name).await;

        Ok(ContainerOutcome { exit_code, output })
    }

    async fn collect_logs(&self, name: &str) -> String {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            ..Default::default()
        };

        let mut stream = self.docker.logs(name, Some(options));
        let mut output = String::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(LogOutput::StdOut { message }) | Ok(LogOutput::StdErr { message }) => {
                    output.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Log stream error");
                }
            }
        }
        output
    }

    async fn remove(&self, name: &str) {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        if let Err(e) = self.docker.remove_container(name, Some(options)).await {
            warn!(container = %name, error = %e, "Failed to remove container");
        }
    }
}
