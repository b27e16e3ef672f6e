//! # Storage and Persistence
//!
//! SQLite connectivity, embedded migrations and the repositories used by the
//! credential/session core. Repositories never open transactions themselves:
//! every call takes the caller's connection, which is normally the inside of
//! a [`DbTransaction`].

pub mod migrations;
pub mod pool;
pub mod repositories;


pub use crate::config::DatabaseConfig;

pub use migrations::run_migrations;
pub use pool::{create_pool, DbConnection, DbPool, DbTransaction};
pub use repositories::{
    SessionRepository, SqlxSessionRepository, SqlxUserRepository, UserRepository,
};

use crate::errors::{Error, Result};

/// Open a write transaction on the pool. Dropping it without `commit` rolls back.
///
/// `BEGIN IMMEDIATE` takes the SQLite write lock up front, so concurrent
/// writers queue on the busy timeout. A deferred transaction that reads
/// first would instead fail with `SQLITE_BUSY` when upgrading.
pub async fn begin(pool: &DbPool) -> Result<DbTransaction<'static>> {
    pool.begin_with("BEGIN IMMEDIATE")
        .await
        .map_err(|e| Error::database(e, "Failed to begin transaction"))
}

/// Commit a transaction, attributing a failure to `operation`.
pub async fn commit(tx: DbTransaction<'_>, operation: &str) -> Result<()> {
    tx.commit()
        .await
        .map_err(|e| Error::database(e, format!("Failed to commit {} transaction", operation)))
}

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| Error::database(e, "Database connectivity check failed"))?;

    Ok(())
}
