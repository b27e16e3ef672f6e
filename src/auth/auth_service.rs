//! Credential and session lifecycle: register, login, refresh, logout and
//! password change.
//!
//! Every operation runs on the caller's connection, normally `&mut *tx` of an
//! open transaction. Nothing here begins or commits the outer transaction, so
//! an error, a timeout or a dropped future leaves no partial writes behind.

use std::sync::Arc;

use sqlx::Connection;
use tracing::{field, info, instrument, warn};
use validator::Validate;

use crate::auth::hashing::CredentialHasher;
use crate::auth::jwt::JwtCodec;
use crate::auth::models::AuthContext;
use crate::auth::session::TokenPair;
use crate::auth::user::{NewUser, UpdateUser, User, UserResponse, UserSummary};
use crate::auth::validation::{ChangePasswordRequest, LoginRequest, RegisterRequest};
use crate::domain::UserId;
use crate::errors::{Error, Result};
use crate::observability::{record_auth_attempt, AuthOutcome};
use crate::storage::{
    DbConnection, SessionRepository, SqlxSessionRepository, SqlxUserRepository, UserRepository,
};

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    hasher: CredentialHasher,
    codec: JwtCodec,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        hasher: CredentialHasher,
        codec: JwtCodec,
    ) -> Self {
        Self { users, sessions, hasher, codec }
    }

    pub fn with_sqlx(hasher: CredentialHasher, codec: JwtCodec) -> Self {
        Self::new(
            Arc::new(SqlxUserRepository::new()),
            Arc::new(SqlxSessionRepository::new()),
            hasher,
            codec,
        )
    }

    /// Resolve a bearer access token into the caller's identity.
    pub fn authenticate(&self, access_token: &str) -> Result<AuthContext> {
        let claims = self.codec.verify_access(access_token)?;
        Ok(AuthContext::from(claims))
    }

    /// Create an account and return its public projection.
    #[instrument(skip(self, conn, request), fields(user_id = field::Empty))]
    pub async fn register(
        &self,
        conn: &mut DbConnection,
        request: RegisterRequest,
    ) -> Result<UserResponse> {
        request.validate()?;
        let role = request
            .parsed_role()
            .ok_or_else(|| Error::validation_field("invalid role", "role"))?;
        let email = User::normalize_email(&request.email);

        if self.users.get_user_by_email(conn, &email).await?.is_some() {
            record_auth_attempt("register", AuthOutcome::Failure);
            return Err(Error::DuplicateEmail);
        }

        let password_hash = self.hasher.hash_password(&request.password)?;
        let user = self
            .users
            .create_user(
                conn,
                NewUser { id: UserId::new(), name: request.name, email, password_hash, role },
            )
            .await?;

        tracing::Span::current().record("user_id", field::display(&user.id));
        record_auth_attempt("register", AuthOutcome::Success);
        info!(role = %user.role, "user registered");
        Ok(user.into())
    }

    /// Exchange email and password for an access/refresh token pair.
    ///
    /// Unknown email and wrong password both return
    /// [`Error::InvalidCredentials`] after one Argon2 verification.
    #[instrument(skip(self, conn, request), fields(user_id = field::Empty))]
    pub async fn login(&self, conn: &mut DbConnection, request: LoginRequest) -> Result<TokenPair> {
        request.validate()?;
        let email = User::normalize_email(&request.email);

        let Some((user, password_hash)) = self.users.get_user_with_password(conn, &email).await?
        else {
            self.hasher.equalise_timing(&request.password);
            record_auth_attempt("login", AuthOutcome::Failure);
            return Err(Error::InvalidCredentials);
        };

        if !self.hasher.verify_password(&request.password, &password_hash)? {
            record_auth_attempt("login", AuthOutcome::Failure);
            return Err(Error::InvalidCredentials);
        }

        tracing::Span::current().record("user_id", field::display(&user.id));
        let pair = self.issue_session(conn, &user).await?;
        record_auth_attempt("login", AuthOutcome::Success);
        info!("login succeeded");
        Ok(pair)
    }

    /// Rotate a refresh token: the presented token is consumed and a new
    /// pair is issued. A token can be exchanged at most once.
    #[instrument(skip(self, conn, refresh_token), fields(user_id = field::Empty))]
    pub async fn refresh_token(
        &self,
        conn: &mut DbConnection,
        refresh_token: &str,
    ) -> Result<TokenPair> {
        let result = self.rotate(conn, refresh_token).await;
        let outcome = if result.is_ok() { AuthOutcome::Success } else { AuthOutcome::Failure };
        record_auth_attempt("refresh", outcome);
        result
    }

    async fn rotate(&self, conn: &mut DbConnection, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.codec.verify_refresh(refresh_token)?;
        tracing::Span::current().record("user_id", field::display(&claims.sub));

        let session = self
            .sessions
            .find_by_token(conn, refresh_token)
            .await?
            .filter(|session| session.user_id == claims.sub)
            .ok_or(Error::TokenInvalidated)?;

        let user = self.users.get_user(conn, &session.user_id).await?.ok_or(Error::UserNotFound)?;

        match self.sessions.delete(conn, &session.id).await {
            Ok(0) => return Err(Error::TokenInvalidated),
            Ok(_) => {}
            Err(Error::Database { source, .. }) => return Err(Error::InvalidateFailure { source }),
            Err(other) => return Err(other),
        }

        let pair = self.issue_session(conn, &user).await?;
        info!(session_id = %session.id, "refresh token rotated");
        Ok(pair)
    }

    /// Revoke every session of the access token's subject. Returns the
    /// number of sessions removed.
    #[instrument(skip(self, conn, access_token), fields(user_id = field::Empty))]
    pub async fn logout(&self, conn: &mut DbConnection, access_token: &str) -> Result<u64> {
        let claims = self.codec.verify_access(access_token)?;
        tracing::Span::current().record("user_id", field::display(&claims.sub));

        let revoked = self.sessions.delete_by_user_id(conn, &claims.sub).await?;
        info!(revoked, "user logged out");
        Ok(revoked)
    }

    /// Replace the caller's password and revoke their sessions.
    ///
    /// Revocation is best effort: it runs inside a savepoint and a failure
    /// there is logged without failing the password change.
    #[instrument(skip(self, conn, request), fields(user_id = %user_id))]
    pub async fn change_password(
        &self,
        conn: &mut DbConnection,
        user_id: &UserId,
        request: ChangePasswordRequest,
    ) -> Result<()> {
        request.validate()?;

        let (_, current_hash) = self
            .users
            .get_user_with_password_by_id(conn, user_id)
            .await?
            .ok_or(Error::UserNotFound)?;

        if !self.hasher.verify_password(&request.old_password, &current_hash)? {
            return Err(Error::IncorrectOldPassword);
        }
        if self.hasher.verify_password(&request.new_password, &current_hash)? {
            return Err(Error::PasswordUnchanged);
        }

        let password_hash = self.hasher.hash_password(&request.new_password)?;
        self.users
            .update_user(
                conn,
                user_id,
                UpdateUser { password_hash: Some(password_hash), ..Default::default() },
            )
            .await?;

        self.revoke_sessions_best_effort(conn, user_id).await;
        info!("password changed");
        Ok(())
    }

    async fn revoke_sessions_best_effort(&self, conn: &mut DbConnection, user_id: &UserId) {
        let mut savepoint = match conn.begin().await {
            Ok(savepoint) => savepoint,
            Err(err) => {
                warn!(error = %err, "session revocation failed to open a savepoint");
                return;
            }
        };

        match self.sessions.delete_by_user_id(&mut *savepoint, user_id).await {
            Ok(revoked) => {
                if let Err(err) = savepoint.commit().await {
                    warn!(error = %err, "session revocation failed to release savepoint");
                } else {
                    info!(revoked, "sessions revoked after password change");
                }
            }
            Err(err) => {
                warn!(error = %err, "session revocation failed after password change");
                if let Err(rollback_err) = savepoint.rollback().await {
                    warn!(error = %rollback_err, "failed to roll back revocation savepoint");
                }
            }
        }
    }

    async fn issue_session(&self, conn: &mut DbConnection, user: &User) -> Result<TokenPair> {
        let access = self.codec.issue_access_token(user)?;
        let refresh = self.codec.issue_refresh_token(&user.id)?;

        self.sessions.create(conn, &user.id, &refresh.token, refresh.expires_at).await?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            access_expires_at: access.expires_at,
            refresh_expires_at: refresh.expires_at,
            user: UserSummary::from(user),
        })
    }
}
