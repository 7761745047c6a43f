//! Migrate command - applies database migrations and exits.

use anyhow::{Context, Result};
use colored::Colorize;

use qa_core::db::{connect_with_retry, run_migrations, RetryConfig};

/// Applies all pending migrations to `database_url`.
pub async fn run_migrate(database_url: &str) -> Result<()> {
    let pool = connect_with_retry(database_url, RetryConfig::startup())
        .await
        .context("Failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    pool.close().await;

    println!("  {} Migrations complete", "✓".green());
    Ok(())
}
