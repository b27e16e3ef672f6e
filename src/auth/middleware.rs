//! Axum middleware for authentication and role-based authorization.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, State},
    http::{HeaderMap, Method, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use tracing::{field, info_span, warn, Instrument};

use crate::api::error::ApiError;
use crate::auth::auth_service::AuthService;
use crate::auth::authorization::authorize;
use crate::auth::models::AuthContext;
use crate::auth::user::Role;
use crate::errors::{Error, Result};

pub type AuthServiceState = Arc<AuthService>;
pub type RoleState = &'static [Role];

/// Extract the bearer credential from `Authorization`.
pub fn bearer_token(headers: &HeaderMap) -> Result<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|header| header.token().trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(Error::MissingToken)
}

/// Verify the access token and attach an [`AuthContext`] to the request.
pub async fn authenticate(
    State(auth_service): State<AuthServiceState>,
    mut request: Request<Body>,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let span = info_span!(
        "auth_middleware.authenticate",
        http.method = %request.method(),
        http.path = %request.uri().path(),
        user_id = field::Empty
    );

    let context = {
        let _guard = span.enter();
        let resolved = bearer_token(request.headers())
            .and_then(|token| auth_service.authenticate(&token));

        match resolved {
            Ok(context) => {
                span.record("user_id", field::display(&context.user_id));
                context
            }
            Err(err) => {
                warn!(error = %err, "authentication failed");
                return Err(err.into());
            }
        }
    };

    request.extensions_mut().insert(context);
    Ok(next.run(request).instrument(span).await)
}

/// Reject callers whose role is not in the allow-list carried as state.
pub async fn require_roles(
    State(allowed): State<RoleState>,
    Extension(context): Extension<AuthContext>,
    request: Request<Body>,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    if let Err(err) = authorize(&context, allowed) {
        warn!(
            user_id = %context.user_id,
            role = %context.role,
            path = %request.uri().path(),
            "authorization denied"
        );
        return Err(err.into());
    }

    Ok(next.run(request).await)
}
