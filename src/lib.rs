//! # erpgate
//!
//! Authentication and user-directory backend for an ERP front end.
//!
//! Users register with one of five roles, log in for a short-lived access
//! token plus a rotating refresh token, and an admin can page through,
//! update and delete accounts. Refresh tokens are backed by server-side
//! sessions so logout, password change and account deletion revoke them.
//!
//! ## Architecture
//!
//! ```text
//! HTTP (axum) → handlers → AuthService / UserService → repositories → SQLite
//!                  ↓
//!         access gate + role gate
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod storage;

pub use config::AppConfig;
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
