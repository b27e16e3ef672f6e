use std::sync::Arc;

use anyhow::Context;
use erpgate::{
    api::{start_api_server, ApiState},
    auth::{AuthService, CleanupService, CredentialHasher, JwtCodec, UserService},
    config::AppConfig,
    observability::{init_observability, log_config_info},
    storage::create_pool,
    APP_NAME, VERSION,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists; it must be read before any configuration.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let config = AppConfig::from_env().context("failed to load configuration")?;
    init_observability(&config.observability).context("failed to initialize observability")?;

    info!(app_name = APP_NAME, version = VERSION, "Starting erpgate");
    log_config_info(&config);

    let pool = create_pool(&config.database).await.context("failed to create database pool")?;

    let hasher = CredentialHasher::new(&config.auth.password_hash)?;
    let codec = JwtCodec::new(&config.auth.jwt())?;
    let auth_service = Arc::new(AuthService::with_sqlx(hasher, codec));
    let user_service = Arc::new(UserService::with_sqlx());

    let shutdown = CancellationToken::new();
    let sweeper = config.auth.session_sweep_interval().map(|every| {
        CleanupService::with_sqlx(pool.clone()).spawn(every, shutdown.child_token())
    });

    let state = ApiState::new(pool.clone(), auth_service, user_service, &config);
    let signal = shutdown.clone();
    let result = start_api_server(&config.server, state, async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    error!(error = %e, "API server shutdown listener failed");
                }
                info!("Shutdown signal received");
            }
            _ = signal.cancelled() => {}
        }
    })
    .await;

    shutdown.cancel();
    if let Some(handle) = sweeper {
        if let Err(e) = handle.await {
            error!(error = %e, "session sweeper terminated abnormally");
        }
    }
    pool.close().await;

    if let Err(e) = result {
        error!(error = %e, "erpgate terminated with error");
        return Err(e.into());
    }

    info!("erpgate shutdown completed");
    Ok(())
}
