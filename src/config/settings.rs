//! # Configuration Settings
//!
//! Defines the configuration structure for the erpgate service.

use crate::auth::hashing::PasswordHashConfig;
use crate::auth::jwt::JwtConfig;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

/// Minimum accepted length of either JWT signing secret.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// Server configuration
    #[validate(nested)]
    pub server: ServerConfig,

    /// Database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Authentication configuration
    #[validate(nested)]
    pub auth: AuthConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            server: ServerConfig::from_lookup(&lookup)?,
            database: DatabaseConfig::from_lookup(&lookup)?,
            auth: AuthConfig::from_lookup(&lookup)?,
            observability: ObservabilityConfig::from_lookup(&lookup)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()
    }

    fn validate_custom(&self) -> Result<()> {
        if !self.database.is_sqlite() {
            return Err(Error::config("DATABASE_URL must start with 'sqlite:'"));
        }

        if self.auth.jwt_secret.len() < MIN_SECRET_LENGTH
            || self.auth.jwt_refresh_secret.len() < MIN_SECRET_LENGTH
        {
            return Err(Error::config(format!(
                "JWT_SECRET_KEY and JWT_REFRESH_KEY must be at least {} characters long",
                MIN_SECRET_LENGTH
            )));
        }

        if self.auth.jwt_secret == self.auth.jwt_refresh_secret {
            return Err(Error::config("JWT_SECRET_KEY and JWT_REFRESH_KEY must differ"));
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Per-request deadline applied to every auth operation
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub request_timeout_seconds: u64,

    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_seconds: 30,
            enable_cors: true,
        }
    }
}

impl ServerConfig {
    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: &F) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            host: lookup("ERPGATE_HOST").unwrap_or(defaults.host),
            port: parse_or(lookup, "ERPGATE_PORT", defaults.port)?,
            request_timeout_seconds: parse_or(
                lookup,
                "ERPGATE_REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            )?,
            enable_cors: flag_or(lookup, "ERPGATE_ENABLE_CORS", defaults.enable_cors),
        })
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    #[validate(range(max = 50, message = "Min connections must be between 0 and 50"))]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/erpgate.db".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }

    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }

    /// Create DatabaseConfig from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: &F) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            url: lookup("DATABASE_URL").unwrap_or(defaults.url),
            max_connections: parse_or(
                lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.max_connections,
            )?,
            min_connections: parse_or(
                lookup,
                "DATABASE_MIN_CONNECTIONS",
                defaults.min_connections,
            )?,
            connect_timeout_seconds: parse_or(
                lookup,
                "DATABASE_CONNECT_TIMEOUT_SECONDS",
                defaults.connect_timeout_seconds,
            )?,
            idle_timeout_seconds: parse_or(
                lookup,
                "DATABASE_IDLE_TIMEOUT_SECONDS",
                defaults.idle_timeout_seconds,
            )?,
            auto_migrate: flag_or(lookup, "DATABASE_AUTO_MIGRATE", defaults.auto_migrate),
        })
    }
}

/// Authentication configuration
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    /// Access-token signing secret (`JWT_SECRET_KEY`)
    #[validate(length(min = 1, message = "JWT_SECRET_KEY cannot be empty"))]
    pub jwt_secret: String,

    /// Refresh-token signing secret (`JWT_REFRESH_KEY`)
    #[validate(length(min = 1, message = "JWT_REFRESH_KEY cannot be empty"))]
    pub jwt_refresh_secret: String,

    /// Mark the refresh cookie `Secure`
    pub cookie_secure: bool,

    /// Interval between expired-session sweeps (0 = disabled)
    pub session_sweep_seconds: u64,

    pub password_hash: PasswordHashConfig,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_refresh_secret", &"<redacted>")
            .field("cookie_secure", &self.cookie_secure)
            .field("session_sweep_seconds", &self.session_sweep_seconds)
            .field("password_hash", &self.password_hash)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_refresh_secret: String::new(),
            cookie_secure: false,
            session_sweep_seconds: 3600,
            password_hash: PasswordHashConfig::default(),
        }
    }
}

impl AuthConfig {
    pub fn jwt(&self) -> JwtConfig {
        JwtConfig {
            access_secret: self.jwt_secret.clone(),
            refresh_secret: self.jwt_refresh_secret.clone(),
        }
    }

    /// Sweep interval, or `None` when sweeping is disabled
    pub fn session_sweep_interval(&self) -> Option<Duration> {
        if self.session_sweep_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.session_sweep_seconds))
        }
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: &F) -> Result<Self> {
        let defaults = Self::default();
        let jwt_secret = lookup("JWT_SECRET_KEY")
            .ok_or_else(|| Error::config("JWT_SECRET_KEY must be set"))?;
        let jwt_refresh_secret = lookup("JWT_REFRESH_KEY")
            .ok_or_else(|| Error::config("JWT_REFRESH_KEY must be set"))?;

        Ok(Self {
            jwt_secret,
            jwt_refresh_secret,
            cookie_secure: flag_or(lookup, "ERPGATE_COOKIE_SECURE", defaults.cookie_secure),
            session_sweep_seconds: parse_or(
                lookup,
                "ERPGATE_SESSION_SWEEP_SECONDS",
                defaults.session_sweep_seconds,
            )?,
            password_hash: PasswordHashConfig {
                memory_kib: parse_or(
                    lookup,
                    "ERPGATE_ARGON2_MEMORY_KIB",
                    defaults.password_hash.memory_kib,
                )?,
                ..defaults.password_hash
            },
        })
    }
}

/// Observability configuration for logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Install the Prometheus exporter (requires the `prometheus` feature)
    pub enable_metrics: bool,

    /// Metrics server port (0 = disabled)
    pub metrics_port: u16,

    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enable_metrics: false,
            metrics_port: 9090,
            service_name: "erpgate".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}

impl ObservabilityConfig {
    /// Get metrics bind address (None if disabled)
    pub fn metrics_bind_address(&self) -> Option<String> {
        if !self.enable_metrics || self.metrics_port == 0 {
            None
        } else {
            Some(format!("0.0.0.0:{}", self.metrics_port))
        }
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: &F) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            enable_metrics: flag_or(lookup, "ERPGATE_ENABLE_METRICS", defaults.enable_metrics),
            metrics_port: parse_or(lookup, "ERPGATE_METRICS_PORT", defaults.metrics_port)?,
            service_name: lookup("ERPGATE_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: lookup("ERPGATE_LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logging: flag_or(lookup, "ERPGATE_JSON_LOGS", defaults.json_logging),
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| Error::config(format!("Invalid value for {}: {}", key, e))),
        None => Ok(default),
    }
}

fn flag_or<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: bool) -> bool {
    lookup(key).map(|s| s.eq_ignore_ascii_case("true") || s == "1").unwrap_or(default)
}
