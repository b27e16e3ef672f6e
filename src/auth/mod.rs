//! Authentication and authorization module entry point.
//!
//! Password hashing, the JWT codec, the session lifecycle orchestrator, the
//! user directory service and the axum access gate.

pub mod auth_service;
pub mod authorization;
pub mod cleanup_service;
pub mod hashing;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod session;
pub mod user;
pub mod user_service;
pub mod validation;

pub use auth_service::AuthService;
pub use cleanup_service::CleanupService;
pub use hashing::{CredentialHasher, PasswordHashConfig};
pub use jwt::{JwtCodec, JwtConfig, TokenError, TokenKind};
pub use models::AuthContext;
pub use session::{Session, TokenPair, REFRESH_COOKIE_NAME};
pub use user::{Role, User, UserResponse};
pub use user_service::{PaginatedResponse, UserService};
