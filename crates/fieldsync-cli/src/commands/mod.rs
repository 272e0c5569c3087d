//! CLI command implementations.

pub mod dequeue;
pub mod jobs;

use anyhow::{Context, Result};
use fieldsync_db::{create_pool, run_migrations};

/// Apply pending database migrations.
pub async fn migrate(database_url: &str) -> Result<()> {
    let pool = create_pool(database_url)
        .await
        .context("Failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;
    println!("Migrations applied");
    Ok(())
}
