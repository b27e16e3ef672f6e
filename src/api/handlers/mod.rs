//! HTTP request handlers organized by resource type

pub mod auth;
pub mod health;
pub mod users;

pub use auth::{
    change_password_handler, login_handler, logout_handler, refresh_token_handler,
    register_handler,
};
pub use health::health_handler;
pub use users::{delete_user_handler, get_user_handler, list_users_handler, update_user_handler};

use std::future::Future;

use tracing::warn;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::errors::{Error, Result};

/// Run `work` under the configured request deadline.
///
/// On expiry the future is dropped, which drops any open transaction inside
/// it and rolls its writes back.
pub(crate) async fn within_deadline<T, F>(
    state: &ApiState,
    operation: &'static str,
    work: F,
) -> std::result::Result<T, ApiError>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(state.request_timeout, work).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => {
            let timeout_ms = u64::try_from(state.request_timeout.as_millis()).unwrap_or(u64::MAX);
            warn!(operation, timeout_ms, "request deadline exceeded, transaction rolled back");
            Err(Error::timeout(operation, timeout_ms).into())
        }
    }
}
