//! # Error Handling
//!
//! Tagged error kinds shared by the credential/session core, the user
//! directory and the HTTP layer. Callers branch on the variant (or on
//! [`Error::kind`]), never on the rendered message.

/// Custom result type for erpgate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for erpgate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Request shape or configuration value rejected by validation
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    #[error("email already exists")]
    DuplicateEmail,

    /// Unknown email and wrong password share this variant so login cannot
    /// be used to enumerate accounts.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    /// The refresh token verified but no live session backs it any more.
    #[error("refresh token not found or has been invalidated")]
    TokenInvalidated,

    #[error("user not found")]
    UserNotFound,

    #[error("incorrect old password")]
    IncorrectOldPassword,

    #[error("new password must be different from old password")]
    PasswordUnchanged,

    #[error("you don't have permission to access this resource")]
    Forbidden,

    #[error("missing authorization token")]
    MissingToken,

    /// Deleting the consumed session during rotation failed.
    #[error("failed to invalidate old token")]
    InvalidateFailure {
        #[source]
        source: sqlx::Error,
    },

    /// Storage faults (the persistence error kind)
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation timed out: {operation} after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Wrap a sqlx error with the operation that produced it
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    pub fn timeout<S: Into<String>>(operation: S, duration_ms: u64) -> Self {
        Self::Timeout { operation: operation.into(), duration_ms }
    }

    /// Stable snake_case tag for logs, metrics and API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation_failed",
            Error::DuplicateEmail => "duplicate_email",
            Error::InvalidCredentials => "invalid_credentials",
            Error::InvalidOrExpiredToken => "invalid_or_expired_token",
            Error::TokenInvalidated => "token_invalidated",
            Error::UserNotFound => "user_not_found",
            Error::IncorrectOldPassword => "incorrect_old_password",
            Error::PasswordUnchanged => "password_unchanged",
            Error::Forbidden => "forbidden",
            Error::MissingToken => "missing_token",
            Error::InvalidateFailure { .. } => "invalidate_failure",
            Error::Database { .. } => "persistence_error",
            Error::Config(_) => "config_error",
            Error::Timeout { .. } => "timeout",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code that should be returned for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation { .. } => 400,
            Error::DuplicateEmail => 409,
            Error::InvalidCredentials => 401,
            Error::InvalidOrExpiredToken => 401,
            Error::TokenInvalidated => 401,
            Error::UserNotFound => 404,
            Error::IncorrectOldPassword => 400,
            Error::PasswordUnchanged => 400,
            Error::Forbidden => 403,
            Error::MissingToken => 401,
            Error::InvalidateFailure { .. } => 500,
            Error::Database { .. } => 500,
            Error::Config(_) => 500,
            Error::Timeout { .. } => 504,
            Error::Internal(_) => 500,
        }
    }

    /// True when a sqlx error is a UNIQUE constraint violation.
    pub fn is_unique_violation(source: &sqlx::Error) -> bool {
        source.as_database_error().map(|db_err| db_err.is_unique_violation()).unwrap_or(false)
    }
}

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        Self::Internal(format!("Migration failed: {}", error))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or_else(|| e.code.to_string(), |m| m.to_string())
                    })
                    .collect();
                (field.to_string(), messages.join(", "))
            })
            .collect::<Vec<_>>();
        fields.sort();

        let field = if fields.len() == 1 { Some(fields[0].0.clone()) } else { None };
        let message = fields
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages))
            .collect::<Vec<_>>()
            .join("; ");

        Self::Validation { message: format!("Validation failed: {}", message), field }
    }
}
