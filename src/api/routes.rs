use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{
    auth_service::AuthService,
    authorization::USER_ADMIN_ROLES,
    middleware::{authenticate, require_roles, RoleState},
    user_service::UserService,
};
use crate::config::AppConfig;
use crate::storage::DbPool;

use super::handlers::{
    change_password_handler, delete_user_handler, get_user_handler, health_handler,
    list_users_handler, login_handler, logout_handler, refresh_token_handler, register_handler,
    update_user_handler,
};

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub pool: DbPool,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub request_timeout: Duration,
    pub cookie_secure: bool,
}

impl ApiState {
    pub fn new(
        pool: DbPool,
        auth: Arc<AuthService>,
        users: Arc<UserService>,
        config: &AppConfig,
    ) -> Self {
        Self {
            pool,
            auth,
            users,
            request_timeout: config.server.request_timeout(),
            cookie_secure: config.auth.cookie_secure,
        }
    }
}

pub fn build_router(state: ApiState, enable_cors: bool) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.auth.clone(), authenticate);
    let role_layer = |roles: RoleState| middleware::from_fn_with_state(roles, require_roles);

    let public = Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/auth/register", post(register_handler))
        .route("/api/v1/auth/login", post(login_handler))
        .route("/api/v1/auth/refresh-token", post(refresh_token_handler));

    let secured = Router::new()
        .route("/api/v1/auth/logout", post(logout_handler))
        .route("/api/v1/auth/change-password", post(change_password_handler))
        .merge(
            Router::new()
                .route("/api/v1/users", get(list_users_handler))
                .route(
                    "/api/v1/users/{id}",
                    get(get_user_handler).put(update_user_handler).delete(delete_user_handler),
                )
                .route_layer(role_layer(USER_ADMIN_ROLES)),
        )
        .route_layer(auth_layer);

    let router = public.merge(secured).with_state(state).layer(
        TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            crate::request_span!(request.method(), request.uri().path())
        }),
    );

    if enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
