//! User directory service for admin operations.
//!
//! Listing, lookup, profile update and deletion. Callers are expected to
//! have passed the admin gate already; this layer does not re-check roles.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use crate::auth::user::{UpdateUser, User, UserResponse};
use crate::auth::validation::{PaginationQuery, UpdateUserRequest};
use crate::domain::UserId;
use crate::errors::{Error, Result};
use crate::storage::{
    DbConnection, SessionRepository, SqlxSessionRepository, SqlxUserRepository, UserRepository,
};

/// One page of a listing plus the arithmetic a client needs to page on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub current_page: u32,
    pub limit: u32,
    pub total_items: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub data: Vec<T>,
}

impl<T> PaginatedResponse<T> {
    pub fn new(current_page: u32, limit: u32, total_items: i64, data: Vec<T>) -> Self {
        let limit_i64 = i64::from(limit.max(1));
        let total_pages = (total_items + limit_i64 - 1) / limit_i64;

        Self {
            current_page,
            limit,
            total_items,
            total_pages,
            has_next: i64::from(current_page) < total_pages,
            has_previous: current_page > 1,
            data,
        }
    }
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService").finish_non_exhaustive()
    }
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, sessions: Arc<dyn SessionRepository>) -> Self {
        Self { users, sessions }
    }

    pub fn with_sqlx() -> Self {
        Self::new(Arc::new(SqlxUserRepository::new()), Arc::new(SqlxSessionRepository::new()))
    }

    #[instrument(skip(self, conn))]
    pub async fn list_users(
        &self,
        conn: &mut DbConnection,
        query: PaginationQuery,
    ) -> Result<PaginatedResponse<UserResponse>> {
        let page = query.page();
        let limit = query.limit();
        let offset = i64::from(page - 1) * i64::from(limit);

        let total = self.users.count_users(conn).await?;
        let users = self.users.list_users(conn, i64::from(limit), offset).await?;

        Ok(PaginatedResponse::new(
            page,
            limit,
            total,
            users.into_iter().map(UserResponse::from).collect(),
        ))
    }

    #[instrument(skip(self, conn), fields(user_id = %id))]
    pub async fn get_user(&self, conn: &mut DbConnection, id: &UserId) -> Result<UserResponse> {
        self.users.get_user(conn, id).await?.map(UserResponse::from).ok_or(Error::UserNotFound)
    }

    /// Update name, email and/or role. A new email is re-checked for uniqueness.
    #[instrument(skip(self, conn, request), fields(user_id = %id))]
    pub async fn update_user(
        &self,
        conn: &mut DbConnection,
        id: &UserId,
        request: UpdateUserRequest,
    ) -> Result<UserResponse> {
        request.validate()?;

        let current = self.users.get_user(conn, id).await?.ok_or(Error::UserNotFound)?;
        let email = request.email.as_deref().map(User::normalize_email);

        if let Some(email) = email.as_deref().filter(|email| *email != current.email) {
            if let Some(existing) = self.users.get_user_by_email(conn, email).await? {
                if existing.id != *id {
                    return Err(Error::DuplicateEmail);
                }
            }
        }

        let update = UpdateUser {
            name: request.name.clone(),
            email,
            role: request.parsed_role(),
            password_hash: None,
        };
        let updated = self.users.update_user(conn, id, update).await?;

        info!(role = %updated.role, "user updated");
        Ok(updated.into())
    }

    /// Revoke the user's sessions, then delete the account.
    #[instrument(skip(self, conn), fields(user_id = %id))]
    pub async fn delete_user(&self, conn: &mut DbConnection, id: &UserId) -> Result<()> {
        if self.users.get_user(conn, id).await?.is_none() {
            return Err(Error::UserNotFound);
        }

        let revoked = self.sessions.delete_by_user_id(conn, id).await?;
        self.users.delete_user(conn, id).await?;

        info!(revoked, "user deleted");
        Ok(())
    }
}
