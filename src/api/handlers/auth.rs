//! Authentication endpoints: register, login, refresh, logout and password change.
//!
//! The refresh token travels in an HttpOnly `refresh_token` cookie. Refresh
//! also accepts it in the JSON body for clients that cannot hold cookies;
//! the cookie wins when both are present.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::error::ApiError;
use crate::api::handlers::within_deadline;
use crate::api::response::WebResponse;
use crate::api::routes::ApiState;
use crate::auth::jwt::REFRESH_TOKEN_TTL_SECS;
use crate::auth::middleware::bearer_token;
use crate::auth::models::AuthContext;
use crate::auth::session::REFRESH_COOKIE_NAME;
use crate::auth::user::{UserResponse, UserSummary};
use crate::auth::validation::{
    ChangePasswordRequest, LoginRequest, RefreshTokenRequest, RegisterRequest,
};
use crate::errors::Error;
use crate::storage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponseData {
    pub access_token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponseData {
    pub access_token: String,
    pub refresh_token: String,
}

fn refresh_cookie(state: &ApiState, token: String) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .secure(state.cookie_secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(REFRESH_TOKEN_TTL_SECS))
        .build()
}

fn cleared_refresh_cookie(state: &ApiState) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .secure(state.cookie_secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::ZERO)
        .build()
}

#[instrument(skip(state, payload))]
pub async fn register_handler(
    State(state): State<ApiState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, WebResponse<UserResponse>), ApiError> {
    let Json(request) = payload?;

    let user = within_deadline(&state, "register", async {
        let mut tx = storage::begin(&state.pool).await?;
        let user = state.auth.register(&mut tx, request).await?;
        storage::commit(tx, "register").await?;
        Ok::<_, Error>(user)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        WebResponse::new(StatusCode::CREATED, "Registration successful", Some(user)),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login_handler(
    State(state): State<ApiState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, WebResponse<LoginResponseData>), ApiError> {
    let Json(request) = payload?;

    let pair = within_deadline(&state, "login", async {
        let mut tx = storage::begin(&state.pool).await?;
        let pair = state.auth.login(&mut tx, request).await?;
        storage::commit(tx, "login").await?;
        Ok::<_, Error>(pair)
    })
    .await?;

    let jar = jar.add(refresh_cookie(&state, pair.refresh_token));
    let data = LoginResponseData { access_token: pair.access_token, user: pair.user };
    Ok((jar, WebResponse::ok("Login successful", data)))
}

/// Cookie first, then a `{ "refresh_token": ... }` body.
fn presented_refresh_token(jar: &CookieJar, body: &Bytes) -> Result<String, ApiError> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE_NAME).filter(|c| !c.value().is_empty()) {
        return Ok(cookie.value().to_string());
    }

    let request: RefreshTokenRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshTokenRequest::default()
    } else {
        serde_json::from_slice(body)
            .map_err(|_| ApiError::bad_request("Invalid request format"))?
    };

    request
        .refresh_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Refresh token not found in cookie or request body"))
}

#[instrument(skip(state, jar, body))]
pub async fn refresh_token_handler(
    State(state): State<ApiState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, WebResponse<RefreshResponseData>), ApiError> {
    let token = presented_refresh_token(&jar, &body)?;

    let result = within_deadline(&state, "refresh_token", async {
        let mut tx = storage::begin(&state.pool).await?;
        let pair = state.auth.refresh_token(&mut tx, &token).await?;
        storage::commit(tx, "refresh_token").await?;
        Ok::<_, Error>(pair)
    })
    .await;

    let pair = match result {
        Ok(pair) => pair,
        Err(err)
            if err.status() == StatusCode::UNAUTHORIZED || err.status() == StatusCode::NOT_FOUND =>
        {
            return Err(ApiError::unauthorized("Invalid or expired refresh token"));
        }
        Err(err) => return Err(err),
    };

    let jar = jar.add(refresh_cookie(&state, pair.refresh_token.clone()));
    let data =
        RefreshResponseData { access_token: pair.access_token, refresh_token: pair.refresh_token };
    Ok((jar, WebResponse::ok("Token successfully refreshed", data)))
}

#[instrument(skip(state, headers, jar))]
pub async fn logout_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, WebResponse<()>), ApiError> {
    let access_token = bearer_token(&headers)?;

    within_deadline(&state, "logout", async {
        let mut tx = storage::begin(&state.pool).await?;
        state.auth.logout(&mut tx, &access_token).await?;
        storage::commit(tx, "logout").await?;
        Ok::<_, Error>(())
    })
    .await?;

    let jar = jar.add(cleared_refresh_cookie(&state));
    Ok((jar, WebResponse::message(StatusCode::OK, "Logout successful")))
}

#[instrument(skip(state, context, jar, payload), fields(user_id = %context.user_id))]
pub async fn change_password_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    jar: CookieJar,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<(CookieJar, WebResponse<()>), ApiError> {
    let Json(request) = payload?;

    within_deadline(&state, "change_password", async {
        let mut tx = storage::begin(&state.pool).await?;
        state.auth.change_password(&mut tx, &context.user_id, request).await?;
        storage::commit(tx, "change_password").await?;
        Ok::<_, Error>(())
    })
    .await?;

    let jar = jar.add(cleared_refresh_cookie(&state));
    Ok((jar, WebResponse::message(StatusCode::OK, "Password changed successfully")))
}
