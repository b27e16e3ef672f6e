//! Admin-only user directory handlers.
//!
//! Routing puts these behind the access gate and the `Admin` allow-list, so
//! handlers only deal with parsing and the response envelope.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use tracing::instrument;

use crate::api::error::ApiError;
use crate::api::handlers::within_deadline;
use crate::api::response::WebResponse;
use crate::api::routes::ApiState;
use crate::auth::user::UserResponse;
use crate::auth::user_service::PaginatedResponse;
use crate::auth::validation::{PaginationQuery, UpdateUserRequest};
use crate::domain::UserId;
use crate::errors::Error;
use crate::storage;

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    UserId::parse(raw)
        .map_err(|_| Error::validation_field(format!("invalid user id '{}'", raw), "id").into())
}

#[instrument(skip(state, query))]
pub async fn list_users_handler(
    State(state): State<ApiState>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<WebResponse<PaginatedResponse<UserResponse>>, ApiError> {
    let Query(query) = query?;

    let page = within_deadline(&state, "list_users", async {
        let mut conn = state
            .pool
            .acquire()
            .await
            .map_err(|e| Error::database(e, "Failed to acquire connection"))?;
        state.users.list_users(&mut conn, query).await
    })
    .await?;

    Ok(WebResponse::ok("Users retrieved successfully", page))
}

#[instrument(skip(state))]
pub async fn get_user_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<WebResponse<UserResponse>, ApiError> {
    let id = parse_user_id(&id)?;

    let user = within_deadline(&state, "get_user", async {
        let mut conn = state
            .pool
            .acquire()
            .await
            .map_err(|e| Error::database(e, "Failed to acquire connection"))?;
        state.users.get_user(&mut conn, &id).await
    })
    .await?;

    Ok(WebResponse::ok("User retrieved successfully", user))
}

#[instrument(skip(state, payload))]
pub async fn update_user_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<WebResponse<UserResponse>, ApiError> {
    let id = parse_user_id(&id)?;
    let Json(request) = payload?;

    let user = within_deadline(&state, "update_user", async {
        let mut tx = storage::begin(&state.pool).await?;
        let user = state.users.update_user(&mut tx, &id, request).await?;
        storage::commit(tx, "update_user").await?;
        Ok::<_, Error>(user)
    })
    .await?;

    Ok(WebResponse::ok("User updated successfully", user))
}

#[instrument(skip(state))]
pub async fn delete_user_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<WebResponse<()>, ApiError> {
    let id = parse_user_id(&id)?;

    within_deadline(&state, "delete_user", async {
        let mut tx = storage::begin(&state.pool).await?;
        state.users.delete_user(&mut tx, &id).await?;
        storage::commit(tx, "delete_user").await?;
        Ok::<_, Error>(())
    })
    .await?;

    Ok(WebResponse::message(StatusCode::OK, "User deleted successfully"))
}
