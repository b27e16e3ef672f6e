//! # REST API
//!
//! Axum routing, handlers and the `{ code, status, message, data }` response
//! envelope for the authentication and user-directory endpoints.

pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;

pub use error::ApiError;
pub use response::WebResponse;
pub use routes::{build_router, ApiState};

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::errors::{Error, Result};

/// Bind the configured address and serve until `shutdown` resolves.
pub async fn start_api_server<F>(config: &ServerConfig, state: ApiState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| Error::config(format!("Invalid API address: {}", e)))?;

    let router = build_router(state, config.enable_cors);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind API server on {}: {}", addr, e)))?;

    info!(address = %addr, "Starting HTTP API server");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::internal(format!("API server error: {}", e)))?;

    info!("API server shutdown completed");
    Ok(())
}
