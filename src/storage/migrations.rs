//! # Database Migration Management
//!
//! Schema migrations are embedded in the binary from `./migrations` and run
//! on startup when `auto_migrate` is enabled.

use sqlx::migrate::Migrator;
use tracing::info;

use crate::errors::Result;
use crate::storage::DbPool;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply all pending migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    info!(available = MIGRATOR.iter().count(), "Running database migrations");
    MIGRATOR.run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}
