//! # Configuration Management
//!
//! Environment-driven configuration for the erpgate service. A `.env` file,
//! when present, is loaded by the binary before [`AppConfig::from_env`] runs.

pub mod settings;

pub use settings::{
    AppConfig, AuthConfig, DatabaseConfig, ObservabilityConfig, ServerConfig, MIN_SECRET_LENGTH,
};
