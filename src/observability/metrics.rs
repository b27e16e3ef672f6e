//! # Metrics Collection
//!
//! Counters for authentication outcomes and the session sweeper. Recording
//! is always on through the `metrics` facade; an exporter is only installed
//! when the `prometheus` feature is built and metrics are enabled.

use crate::config::ObservabilityConfig;
use crate::errors::Result;
use metrics::{counter, describe_counter, Unit};

pub const AUTH_ATTEMPTS_TOTAL: &str = "auth_attempts_total";
pub const SESSIONS_SWEPT_TOTAL: &str = "sessions_swept_total";

/// Outcome label attached to `auth_attempts_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    Failure,
}

impl AuthOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthOutcome::Success => "success",
            AuthOutcome::Failure => "failure",
        }
    }
}

/// Record an authentication attempt for a named operation.
pub fn record_auth_attempt(operation: &'static str, outcome: AuthOutcome) {
    counter!(AUTH_ATTEMPTS_TOTAL, "operation" => operation, "outcome" => outcome.as_str())
        .increment(1);
}

/// Record sessions removed by one sweep.
pub fn record_sessions_swept(count: u64) {
    counter!(SESSIONS_SWEPT_TOTAL).increment(count);
}

fn describe_metrics() {
    describe_counter!(
        AUTH_ATTEMPTS_TOTAL,
        Unit::Count,
        "Authentication operations by operation and outcome"
    );
    describe_counter!(SESSIONS_SWEPT_TOTAL, Unit::Count, "Expired sessions removed by the sweeper");
}

/// Install the metrics exporter if enabled.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    use crate::errors::Error;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let metrics_addr = match config.metrics_bind_address() {
        Some(addr) => addr,
        None => return Ok(()),
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        Error::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name)
        .install()
        .map_err(|e| Error::config(format!("Failed to initialize metrics exporter: {}", e)))?;

    describe_metrics();
    tracing::info!(metrics_addr = %metrics_addr, "Prometheus metrics exporter started");
    Ok(())
}

#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    if config.enable_metrics {
        tracing::warn!("Metrics requested but erpgate was built without the `prometheus` feature");
    }
    describe_metrics();
    Ok(())
}
