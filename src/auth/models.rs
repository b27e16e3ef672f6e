//! Request-scoped identity established by the access gate.

use crate::auth::jwt::AccessClaims;
use crate::auth::user::Role;
use crate::domain::UserId;

/// Caller identity decoded from a verified access token.
///
/// Inserted into request extensions by [`crate::auth::middleware::authenticate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl AuthContext {
    pub fn new(user_id: UserId, name: String, email: String, role: Role) -> Self {
        Self { user_id, name, email, role }
    }

    pub fn is_elevated(&self) -> bool {
        self.role.is_elevated()
    }
}

impl From<AccessClaims> for AuthContext {
    fn from(claims: AccessClaims) -> Self {
        Self { user_id: claims.sub, name: claims.name, email: claims.email, role: claims.role }
    }
}
