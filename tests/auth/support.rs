#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use erpgate::{
    api::{build_router, ApiState},
    auth::{
        validation::{LoginRequest, RegisterRequest},
        AuthService, CredentialHasher, JwtCodec, JwtConfig, PasswordHashConfig, TokenPair,
        UserResponse, UserService,
    },
    config::DatabaseConfig,
    storage::{self, create_pool, DbPool},
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "password123";

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        access_secret: "access-secret-for-tests-0123456789abcdef".into(),
        refresh_secret: "refresh-secret-for-tests-0123456789abcdef".into(),
    }
}

pub struct TestApp {
    pub pool: DbPool,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub request_timeout: Duration,
    _dir: TempDir,
}

impl TestApp {
    pub fn state(&self) -> ApiState {
        ApiState {
            pool: self.pool.clone(),
            auth: self.auth.clone(),
            users: self.users.clone(),
            request_timeout: self.request_timeout,
            cookie_secure: false,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state(), false)
    }

    pub async fn register(&self, name: &str, email: &str, role: &str) -> UserResponse {
        let mut tx = storage::begin(&self.pool).await.expect("begin");
        let user = self
            .auth
            .register(
                &mut tx,
                RegisterRequest {
                    name: name.into(),
                    email: email.into(),
                    password: PASSWORD.into(),
                    role: role.into(),
                },
            )
            .await
            .expect("register");
        storage::commit(tx, "register").await.expect("commit");
        user
    }

    pub async fn login(&self, email: &str, password: &str) -> erpgate::Result<TokenPair> {
        let mut tx = storage::begin(&self.pool).await?;
        let pair = self
            .auth
            .login(&mut tx, LoginRequest { email: email.into(), password: password.into() })
            .await?;
        storage::commit(tx, "login").await?;
        Ok(pair)
    }

    pub async fn refresh(&self, token: &str) -> erpgate::Result<TokenPair> {
        let mut tx = storage::begin(&self.pool).await?;
        let pair = self.auth.refresh_token(&mut tx, token).await?;
        storage::commit(tx, "refresh").await?;
        Ok(pair)
    }

    pub async fn session_count(&self) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM refresh_tokens")
            .fetch_one(&self.pool)
            .await
            .expect("count sessions")
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router().oneshot(request).await.expect("router response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        TestResponse { status, headers, body }
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_timeout(Duration::from_secs(10)).await
}

pub async fn setup_test_app_with_timeout(request_timeout: Duration) -> TestApp {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("erpgate.db").display()),
        max_connections: 5,
        min_connections: 0,
        auto_migrate: true,
        ..Default::default()
    };
    let pool = create_pool(&config).await.expect("create sqlite pool");

    let hasher = CredentialHasher::new(&PasswordHashConfig::insecure_fast()).expect("hasher");
    let codec = JwtCodec::new(&jwt_config()).expect("codec");

    TestApp {
        pool,
        auth: Arc::new(AuthService::with_sqlx(hasher, codec)),
        users: Arc::new(UserService::with_sqlx()),
        request_timeout,
        _dir: dir,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `Set-Cookie` header for the refresh cookie, if any.
    pub fn refresh_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with("refresh_token="))
            .map(str::to_string)
    }

    /// Value of the refresh cookie, without attributes.
    pub fn refresh_cookie_value(&self) -> Option<String> {
        self.refresh_cookie().and_then(|cookie| {
            cookie
                .split(';')
                .next()
                .and_then(|pair| pair.strip_prefix("refresh_token="))
                .map(str::to_string)
        })
    }
}

pub struct RequestBuilder {
    method: Method,
    uri: String,
    bearer: Option<String>,
    cookie: Option<String>,
    body: Option<Value>,
}

pub fn request(method: Method, uri: &str) -> RequestBuilder {
    RequestBuilder { method, uri: uri.to_string(), bearer: None, cookie: None, body: None }
}

impl RequestBuilder {
    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    pub fn refresh_cookie(mut self, token: &str) -> Self {
        self.cookie = Some(format!("refresh_token={}", token));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn build(self) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if let Some(token) = self.bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(cookie) = self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        match self.body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        }
    }
}
