//! Request DTOs and validation rules for the auth and user endpoints.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::{Validate, ValidationError};

use crate::auth::user::Role;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 50, message = "must be between 2 and 50 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 20, message = "must be between 8 and 20 characters"))]
    pub password: String,
    #[validate(custom(function = "validate_role"))]
    pub role: String,
}

impl RegisterRequest {
    /// Parsed role; only meaningful after `validate()` has passed.
    pub fn parsed_role(&self) -> Option<Role> {
        Role::from_str(&self.role).ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// Body form of the refresh request. The cookie takes precedence when both are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub old_password: String,
    #[validate(length(min = 8, max = 20, message = "must be between 8 and 20 characters"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 2, max = 50, message = "must be between 2 and 50 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_role"))]
    pub role: Option<String>,
}

impl UpdateUserRequest {
    pub fn parsed_role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|role| Role::from_str(role).ok())
    }
}

/// `?page=&limit=` query for list endpoints.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PaginationQuery {
    /// Page number starting at 1; zero or absent becomes 1.
    pub fn page(&self) -> u32 {
        self.page.filter(|page| *page > 0).unwrap_or(1)
    }

    /// Page size clamped to `1..=MAX_PAGE_LIMIT`, defaulting to `DEFAULT_PAGE_LIMIT`.
    pub fn limit(&self) -> u32 {
        match self.limit {
            None | Some(0) => DEFAULT_PAGE_LIMIT,
            Some(limit) => limit.min(MAX_PAGE_LIMIT),
        }
    }
}

pub fn validate_role(role: &str) -> Result<(), ValidationError> {
    if Role::from_str(role).is_ok() {
        return Ok(());
    }

    let allowed = Role::ALL.iter().map(Role::as_str).collect::<Vec<_>>().join(", ");
    let mut error = ValidationError::new("invalid_role");
    error.message = Some(format!("must be one of: {}", allowed).into());
    Err(error)
}
