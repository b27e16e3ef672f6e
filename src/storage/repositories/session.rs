//! Refresh-token session repository
//!
//! A row in `refresh_tokens` is a live session. Rotation, logout and
//! password change all revoke by deleting rows; a token with no row is
//! dead regardless of its signature.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

use crate::auth::session::Session;
use crate::domain::{SessionId, UserId};
use crate::errors::{Error, Result};
use crate::storage::DbConnection;

#[derive(Debug, Clone, FromRow)]
struct SessionRow {
    pub id: SessionId,
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            token: row.token,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(
        &self,
        conn: &mut DbConnection,
        user_id: &UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session>;

    /// Look up an unexpired session by its exact token value.
    async fn find_by_token(&self, conn: &mut DbConnection, token: &str)
        -> Result<Option<Session>>;

    async fn list_by_user_id(&self, conn: &mut DbConnection, user_id: &UserId)
        -> Result<Vec<Session>>;

    /// Delete one session. Returns the number of rows removed (0 or 1).
    async fn delete(&self, conn: &mut DbConnection, id: &SessionId) -> Result<u64>;

    /// Delete every session for a user. Returns the number of rows removed.
    async fn delete_by_user_id(&self, conn: &mut DbConnection, user_id: &UserId) -> Result<u64>;

    /// Delete sessions whose expiry is at or before `now`.
    async fn delete_expired(&self, conn: &mut DbConnection, now: DateTime<Utc>) -> Result<u64>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxSessionRepository;

impl SqlxSessionRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    #[instrument(skip(self, conn, token), fields(user_id = %user_id), name = "db_create_session")]
    async fn create(
        &self,
        conn: &mut DbConnection,
        user_id: &UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session> {
        let id = SessionId::new();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token, expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|err| Error::database(err, "Failed to create refresh token session"))?;

        Ok(Session {
            id,
            user_id: user_id.clone(),
            token: token.to_string(),
            expires_at,
            created_at: now,
            updated_at: now,
        })
    }

    #[instrument(skip(self, conn, token), name = "db_find_session_by_token")]
    async fn find_by_token(
        &self,
        conn: &mut DbConnection,
        token: &str,
    ) -> Result<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, user_id, token, expires_at, created_at, updated_at
            FROM refresh_tokens
            WHERE token = $1 AND expires_at > $2
            "#,
        )
        .bind(token)
        .bind(Utc::now())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|err| Error::database(err, "Failed to find refresh token session"))?;

        Ok(row.map(Session::from))
    }

    #[instrument(skip(self, conn), fields(user_id = %user_id), name = "db_list_sessions")]
    async fn list_by_user_id(
        &self,
        conn: &mut DbConnection,
        user_id: &UserId,
    ) -> Result<Vec<Session>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, user_id, token, expires_at, created_at, updated_at
            FROM refresh_tokens
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(|err| Error::database(err, "Failed to list sessions for user"))?;

        Ok(rows.into_iter().map(Session::from).collect())
    }

    #[instrument(skip(self, conn), fields(session_id = %id), name = "db_delete_session")]
    async fn delete(&self, conn: &mut DbConnection, id: &SessionId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(|err| Error::database(err, "Failed to delete session"))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self, conn), fields(user_id = %user_id), name = "db_delete_user_sessions")]
    async fn delete_by_user_id(&self, conn: &mut DbConnection, user_id: &UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await
            .map_err(|err| Error::database(err, "Failed to delete sessions for user"))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self, conn), name = "db_delete_expired_sessions")]
    async fn delete_expired(&self, conn: &mut DbConnection, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(|err| Error::database(err, "Failed to delete expired sessions"))?;

        Ok(result.rows_affected())
    }
}
