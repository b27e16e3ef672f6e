//! User repository
//!
//! CRUD over the `users` table. Emails are normalised before they reach
//! this layer; the UNIQUE index on `email` is the final arbiter of
//! duplicate registration.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::instrument;

use crate::auth::user::{NewUser, Role, UpdateUser, User};
use crate::domain::UserId;
use crate::errors::{Error, Result};
use crate::storage::DbConnection;

#[derive(Debug, Clone, FromRow)]
struct UserRow {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_parts(self) -> Result<(User, String)> {
        let role = Role::from_str(&self.role)
            .map_err(|_| Error::internal(format!("Unknown user role '{}'", self.role)))?;

        let user = User {
            id: self.id,
            name: self.name,
            email: self.email,
            role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        Ok((user, self.password_hash))
    }

    fn into_user(self) -> Result<User> {
        self.into_parts().map(|(user, _)| user)
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. A taken email surfaces as [`Error::DuplicateEmail`].
    async fn create_user(&self, conn: &mut DbConnection, user: NewUser) -> Result<User>;

    async fn get_user(&self, conn: &mut DbConnection, id: &UserId) -> Result<Option<User>>;

    async fn get_user_by_email(&self, conn: &mut DbConnection, email: &str)
        -> Result<Option<User>>;

    /// Get a user with their password hash for authentication
    async fn get_user_with_password(
        &self,
        conn: &mut DbConnection,
        email: &str,
    ) -> Result<Option<(User, String)>>;

    async fn get_user_with_password_by_id(
        &self,
        conn: &mut DbConnection,
        id: &UserId,
    ) -> Result<Option<(User, String)>>;

    /// Merge `update` onto the stored row and bump `updated_at`.
    async fn update_user(
        &self,
        conn: &mut DbConnection,
        id: &UserId,
        update: UpdateUser,
    ) -> Result<User>;

    /// Page through users ordered by creation time.
    async fn list_users(&self, conn: &mut DbConnection, limit: i64, offset: i64)
        -> Result<Vec<User>>;

    async fn count_users(&self, conn: &mut DbConnection) -> Result<i64>;

    /// Delete a user; refresh tokens go with it through the foreign key cascade.
    async fn delete_user(&self, conn: &mut DbConnection, id: &UserId) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxUserRepository;

impl SqlxUserRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    #[instrument(skip(self, conn, user), fields(user_id = %user.id), name = "db_create_user")]
    async fn create_user(&self, conn: &mut DbConnection, user: NewUser) -> Result<User> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|err| {
            if Error::is_unique_violation(&err) {
                Error::DuplicateEmail
            } else {
                Error::database(err, "Failed to create user")
            }
        })?;

        Ok(User {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: now,
            updated_at: now,
        })
    }

    #[instrument(skip(self, conn), fields(user_id = %id), name = "db_get_user")]
    async fn get_user(&self, conn: &mut DbConnection, id: &UserId) -> Result<Option<User>> {
        self.get_user_with_password_by_id(conn, id)
            .await
            .map(|found| found.map(|(user, _)| user))
    }

    #[instrument(skip(self, conn, email), name = "db_get_user_by_email")]
    async fn get_user_by_email(
        &self,
        conn: &mut DbConnection,
        email: &str,
    ) -> Result<Option<User>> {
        self.get_user_with_password(conn, email).await.map(|found| found.map(|(user, _)| user))
    }

    #[instrument(skip(self, conn, email), name = "db_get_user_with_password")]
    async fn get_user_with_password(
        &self,
        conn: &mut DbConnection,
        email: &str,
    ) -> Result<Option<(User, String)>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|err| Error::database(err, "Failed to get user by email"))?;

        row.map(UserRow::into_parts).transpose()
    }

    #[instrument(skip(self, conn), fields(user_id = %id), name = "db_get_user_with_password_by_id")]
    async fn get_user_with_password_by_id(
        &self,
        conn: &mut DbConnection,
        id: &UserId,
    ) -> Result<Option<(User, String)>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|err| Error::database(err, "Failed to get user by ID"))?;

        row.map(UserRow::into_parts).transpose()
    }

    #[instrument(skip(self, conn, update), fields(user_id = %id), name = "db_update_user")]
    async fn update_user(
        &self,
        conn: &mut DbConnection,
        id: &UserId,
        update: UpdateUser,
    ) -> Result<User> {
        let (current, current_hash) =
            self.get_user_with_password_by_id(conn, id).await?.ok_or(Error::UserNotFound)?;

        let name = update.name.unwrap_or(current.name);
        let email = update.email.unwrap_or(current.email);
        let role = update.role.unwrap_or(current.role);
        let password_hash = update.password_hash.unwrap_or(current_hash);
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $1, email = $2, role = $3, password_hash = $4, updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(&name)
        .bind(&email)
        .bind(role.as_str())
        .bind(&password_hash)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|err| {
            if Error::is_unique_violation(&err) {
                Error::DuplicateEmail
            } else {
                Error::database(err, "Failed to update user")
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound);
        }

        Ok(User { id: id.clone(), name, email, role, created_at: current.created_at, updated_at: now })
    }

    #[instrument(skip(self, conn), name = "db_list_users")]
    async fn list_users(
        &self,
        conn: &mut DbConnection,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id LIMIT $1 OFFSET $2",
            USER_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await
        .map_err(|err| Error::database(err, "Failed to list users"))?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    #[instrument(skip(self, conn), name = "db_count_users")]
    async fn count_users(&self, conn: &mut DbConnection) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *conn)
            .await
            .map_err(|err| Error::database(err, "Failed to count users"))
    }

    #[instrument(skip(self, conn), fields(user_id = %id), name = "db_delete_user")]
    async fn delete_user(&self, conn: &mut DbConnection, id: &UserId) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(|err| Error::database(err, "Failed to delete user"))?;

        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound);
        }

        Ok(())
    }
}
