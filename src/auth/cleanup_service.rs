//! Background sweep of expired refresh-token sessions.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{Error, Result};
use crate::observability::record_sessions_swept;
use crate::storage::{DbPool, SessionRepository, SqlxSessionRepository};

#[derive(Clone)]
pub struct CleanupService {
    pool: DbPool,
    sessions: Arc<dyn SessionRepository>,
}

impl CleanupService {
    pub fn new(pool: DbPool, sessions: Arc<dyn SessionRepository>) -> Self {
        Self { pool, sessions }
    }

    pub fn with_sqlx(pool: DbPool) -> Self {
        Self::new(pool, Arc::new(SqlxSessionRepository::new()))
    }

    /// Delete every session whose expiry has passed. Returns the number removed.
    pub async fn run_once(&self) -> Result<u64> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| Error::database(e, "Failed to acquire connection for session sweep"))?;

        let removed = self.sessions.delete_expired(&mut conn, Utc::now()).await?;
        record_sessions_swept(removed);
        if removed > 0 {
            info!(removed, "expired sessions swept");
        } else {
            debug!("no expired sessions to sweep");
        }
        Ok(removed)
    }

    /// Sweep on a fixed interval until `shutdown` is cancelled.
    ///
    /// A failed sweep is logged and retried on the next tick.
    pub fn spawn(self, every: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = every.as_secs(), "session sweeper started");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("session sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(err) = self.run_once().await {
                            warn!(error = %err, "session sweep failed");
                        }
                    }
                }
            }
        })
    }
}
