//! Refresh-token session records and the token pair handed to clients.

use chrono::{DateTime, Utc};

use crate::auth::user::UserSummary;
use crate::domain::{SessionId, UserId};

/// Name of the cookie carrying the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// A persisted refresh token.
///
/// The row, not the token's signature, decides whether a refresh token is
/// still usable: once the row is gone the token is dead even if its own
/// `exp` has not passed. A row whose `expires_at` is at or before now is
/// treated as gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Access and refresh tokens issued together by login or refresh.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub user: UserSummary,
}
