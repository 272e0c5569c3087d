//! Operator commands for creating and inspecting jobs.

use anyhow::{Context, Result, bail};
use fieldsync_core::{JobId, JobStatus, JobType, ProjectId};
use fieldsync_db::{JobRecord, JobRepo, PgJobRepo, create_pool};

async fn repo(database_url: &str) -> Result<PgJobRepo> {
    let pool = create_pool(database_url)
        .await
        .context("Failed to connect to database")?;
    Ok(PgJobRepo::new(pool))
}

/// Insert a pending job for a project.
pub async fn enqueue(database_url: &str, project_id: uuid::Uuid, job_type: &str) -> Result<()> {
    let Ok(job_type) = job_type.parse::<JobType>() else {
        bail!(
            "unknown job type '{}', expected one of: {}",
            job_type,
            JobType::ALL.map(|t| t.as_str()).join(", ")
        );
    };

    let job = repo(database_url)
        .await?
        .enqueue(ProjectId::from_uuid(project_id), job_type)
        .await?;

    println!("Enqueued {} job {}", job.job_type, job.id);
    Ok(())
}

/// Show a job's current status and output.
pub async fn status(database_url: &str, id: uuid::Uuid) -> Result<()> {
    let job = repo(database_url)
        .await?
        .get(JobId::from_uuid(id))
        .await
        .with_context(|| format!("job {}", id))?;

    println!("Job:        {}", job.id);
    println!("Project:    {}", job.project_id);
    println!("Type:       {}", job.job_type);
    println!("Status:     {}", job.status);
    println!("Created:    {}", job.created_at);
    if let Some(started_at) = job.started_at {
        println!("Started:    {}", started_at);
    }
    if let Some(finished_at) = job.finished_at {
        println!("Finished:   {}", finished_at);
    }
    if let Some(feedback) = &job.feedback {
        println!("Feedback:   {}", feedback);
    }
    if let Some(output) = &job.output {
        println!("--- output ---");
        println!("{}", output);
    }
    Ok(())
}

/// List a project's jobs, oldest first. Non-terminal jobs are flagged so
/// operators can spot a stuck queued/started job blocking the project.
pub async fn list(database_url: &str, project_id: uuid::Uuid) -> Result<()> {
    let jobs = repo(database_url)
        .await?
        .list_by_project(ProjectId::from_uuid(project_id))
        .await?;

    if jobs.is_empty() {
        println!("No jobs for project {}", project_id);
        return Ok(());
    }

    for job in &jobs {
        println!(
            "{}  {:20} {:10} {}{}",
            job.id,
            job.job_type,
            job.status,
            job.created_at,
            blocking_marker(job)
        );
    }
    Ok(())
}

fn blocking_marker(job: &JobRecord) -> &'static str {
    match job.status.parse::<JobStatus>() {
        Ok(status) if status.is_active() => "  [blocks project]",
        _ => "",
    }
}
