//! Role-based authorization.
//!
//! A single elevated role (`Admin`) bypasses every allow-list; every other
//! role must be listed explicitly by the operation it wants to reach.

use crate::auth::models::AuthContext;
use crate::auth::user::Role;
use crate::errors::{Error, Result};

/// Roles allowed to reach the user directory.
pub const USER_ADMIN_ROLES: &[Role] = &[Role::Admin];

/// Authorize the caller or fail with [`Error::Forbidden`].
///
/// ```rust
/// use erpgate::auth::{authorization::authorize, AuthContext, Role};
/// use erpgate::domain::UserId;
///
/// let caller = |role| AuthContext::new(UserId::new(), "Caller".into(), "c@x.com".into(), role);
/// assert!(authorize(&caller(Role::Admin), &[]).is_ok());
/// assert!(authorize(&caller(Role::Ppc), &[Role::Ppc, Role::Warehouse]).is_ok());
/// assert!(authorize(&caller(Role::Logistics), &[Role::Ppc]).is_err());
/// ```
pub fn authorize(context: &AuthContext, allowed: &[Role]) -> Result<()> {
    if context.is_elevated() || allowed.contains(&context.role) {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}
