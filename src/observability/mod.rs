//! # Observability Infrastructure
//!
//! Structured logging and metrics for the erpgate service.

pub mod logging;
pub mod metrics;

pub use self::logging::{init_logging, log_config_info};
pub use self::metrics::{init_metrics, record_auth_attempt, record_sessions_swept, AuthOutcome};

use crate::config::ObservabilityConfig;
use crate::errors::Result;

/// Initialize logging and metrics.
pub fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    init_logging(config)?;
    init_metrics(config)?;

    tracing::info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        metrics_enabled = config.enable_metrics,
        "Observability initialized"
    );
    Ok(())
}
