use std::time::Duration;

use axum::http::{Method, StatusCode};
use erpgate::{
    auth::user::{NewUser, Role},
    domain::UserId,
    storage::{SqlxUserRepository, UserRepository},
};
use serde_json::{json, Value};

use crate::support::{request, setup_test_app, setup_test_app_with_timeout, TestApp, PASSWORD};

async fn register_via_api(app: &TestApp, name: &str, email: &str, role: &str) -> Value {
    let response = app
        .send(
            request(Method::POST, "/api/v1/auth/register")
                .json(json!({ "name": name, "email": email, "password": PASSWORD, "role": role }))
                .build(),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.body["data"].clone()
}

/// Log in and return `(access_token, refresh_token)`.
async fn login_via_api(app: &TestApp, email: &str, password: &str) -> (String, String) {
    let response = app
        .send(
            request(Method::POST, "/api/v1/auth/login")
                .json(json!({ "email": email, "password": password }))
                .build(),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    let access = response.body["data"]["access_token"].as_str().unwrap().to_string();
    let refresh = response.refresh_cookie_value().expect("refresh cookie");
    (access, refresh)
}

#[tokio::test]
async fn health_reports_database_status() {
    let app = setup_test_app().await;
    let response = app.send(request(Method::GET, "/health").build()).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["database"], "ok");
}

#[tokio::test]
async fn register_wraps_user_in_envelope() {
    let app = setup_test_app().await;
    let response = app
        .send(
            request(Method::POST, "/api/v1/auth/register")
                .json(json!({
                    "name": "Ada",
                    "email": "Ada@X.com",
                    "password": "longenough1",
                    "role": "Purchasing"
                }))
                .build(),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["code"], 201);
    assert_eq!(response.body["status"], "CREATED");
    assert_eq!(response.body["data"]["email"], "ada@x.com");
    assert_eq!(response.body["data"]["role"], "Purchasing");
    assert!(response.body["data"].get("password").is_none());
    assert!(response.body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn register_rejects_invalid_input() {
    let app = setup_test_app().await;

    let response = app
        .send(
            request(Method::POST, "/api/v1/auth/register")
                .json(json!({
                    "name": "Ada",
                    "email": "ada@x.com",
                    "password": "short",
                    "role": "Purchasing"
                }))
                .build(),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["status"], "BAD REQUEST");
    assert_eq!(response.body["data"]["field"], "password");

    let response = app
        .send(
            request(Method::POST, "/api/v1/auth/register")
                .json(json!({
                    "name": "Ada",
                    "email": "ada@x.com",
                    "password": "longenough1",
                    "role": "Superuser"
                }))
                .build(),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["data"]["field"], "role");

    let response = app
        .send(request(Method::POST, "/api/v1/auth/register").json(json!({ "name": 7 })).build())
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = setup_test_app().await;
    register_via_api(&app, "Ada", "ada@x.com", "Purchasing").await;

    let response = app
        .send(
            request(Method::POST, "/api/v1/auth/register")
                .json(json!({
                    "name": "Ada Again",
                    "email": "ADA@x.com",
                    "password": PASSWORD,
                    "role": "PPC"
                }))
                .build(),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["code"], 409);
}

#[tokio::test]
async fn login_sets_hardened_refresh_cookie() {
    let app = setup_test_app().await;
    register_via_api(&app, "Cookie", "cookie@example.com", "Warehouse").await;

    let response = app
        .send(
            request(Method::POST, "/api/v1/auth/login")
                .json(json!({ "email": "cookie@example.com", "password": PASSWORD }))
                .build(),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["user"]["email"], "cookie@example.com");
    assert!(response.body["data"]["access_token"].is_string());

    let cookie = response.refresh_cookie().expect("refresh cookie");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn login_failure_does_not_reveal_which_field_was_wrong() {
    let app = setup_test_app().await;
    register_via_api(&app, "Enum", "enum@example.com", "Warehouse").await;

    let unknown = app
        .send(
            request(Method::POST, "/api/v1/auth/login")
                .json(json!({ "email": "ghost@example.com", "password": PASSWORD }))
                .build(),
        )
        .await;
    let wrong = app
        .send(
            request(Method::POST, "/api/v1/auth/login")
                .json(json!({ "email": "enum@example.com", "password": "nope-nope" }))
                .build(),
        )
        .await;

    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.body, wrong.body);
    assert!(unknown.refresh_cookie().is_none());
}

#[tokio::test]
async fn refresh_via_cookie_rotates_the_cookie() {
    let app = setup_test_app().await;
    register_via_api(&app, "Rot", "rot@example.com", "PPC").await;
    let (_, refresh) = login_via_api(&app, "rot@example.com", PASSWORD).await;

    let response = app
        .send(
            request(Method::POST, "/api/v1/auth/refresh-token").refresh_cookie(&refresh).build(),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    let rotated = response.refresh_cookie_value().expect("rotated cookie");
    assert_ne!(rotated, refresh);
    assert_eq!(response.body["data"]["refresh_token"], rotated.as_str());

    let reuse = app
        .send(
            request(Method::POST, "/api/v1/auth/refresh-token").refresh_cookie(&refresh).build(),
        )
        .await;
    assert_eq!(reuse.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reuse.body["message"], "Invalid or expired refresh token");
}

#[tokio::test]
async fn refresh_accepts_body_and_prefers_cookie() {
    let app = setup_test_app().await;
    register_via_api(&app, "Body", "body@example.com", "Logistics").await;
    let (_, refresh) = login_via_api(&app, "body@example.com", PASSWORD).await;

    let missing = app.send(request(Method::POST, "/api/v1/auth/refresh-token").build()).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    // The valid cookie wins over a bogus body value.
    let response = app
        .send(
            request(Method::POST, "/api/v1/auth/refresh-token")
                .refresh_cookie(&refresh)
                .json(json!({ "refresh_token": "bogus" }))
                .build(),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let rotated = response.body["data"]["refresh_token"].as_str().unwrap().to_string();

    let response = app
        .send(
            request(Method::POST, "/api/v1/auth/refresh-token")
                .json(json!({ "refresh_token": rotated }))
                .build(),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_for_deleted_account_looks_like_any_other_rejection() {
    let app = setup_test_app().await;
    let user = register_via_api(&app, "Ghost", "ghost@example.com", "PPC").await;
    let (_, refresh) = login_via_api(&app, "ghost@example.com", PASSWORD).await;

    let mut conn = app.pool.acquire().await.unwrap();
    let id = UserId::parse(user["id"].as_str().unwrap()).unwrap();
    SqlxUserRepository::new().delete_user(&mut conn, &id).await.unwrap();
    drop(conn);

    let response = app
        .send(
            request(Method::POST, "/api/v1/auth/refresh-token").refresh_cookie(&refresh).build(),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Invalid or expired refresh token");
}

#[tokio::test]
async fn logout_requires_bearer_and_clears_cookie() {
    let app = setup_test_app().await;
    register_via_api(&app, "Out", "out@example.com", "PPC").await;
    let (access, refresh) = login_via_api(&app, "out@example.com", PASSWORD).await;

    let anonymous = app.send(request(Method::POST, "/api/v1/auth/logout").build()).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let forged = app
        .send(request(Method::POST, "/api/v1/auth/logout").bearer(&refresh).build())
        .await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);

    let response = app
        .send(
            request(Method::POST, "/api/v1/auth/logout")
                .bearer(&access)
                .refresh_cookie(&refresh)
                .build(),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let cleared = response.refresh_cookie().expect("cleared cookie");
    assert!(cleared.starts_with("refresh_token=;"));
    assert!(cleared.contains("Max-Age=0"));
    assert_eq!(app.session_count().await, 0);
}

#[tokio::test]
async fn change_password_over_http() {
    let app = setup_test_app().await;
    register_via_api(&app, "Pw", "pw@example.com", "Warehouse").await;
    let (access, refresh) = login_via_api(&app, "pw@example.com", PASSWORD).await;

    let unchanged = app
        .send(
            request(Method::POST, "/api/v1/auth/change-password")
                .bearer(&access)
                .json(json!({ "old_password": PASSWORD, "new_password": PASSWORD }))
                .build(),
        )
        .await;
    assert_eq!(unchanged.status, StatusCode::BAD_REQUEST);

    let response = app
        .send(
            request(Method::POST, "/api/v1/auth/change-password")
                .bearer(&access)
                .json(json!({ "old_password": PASSWORD, "new_password": "brand-new-1" }))
                .build(),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert!(response.refresh_cookie().unwrap().contains("Max-Age=0"));

    let stale = app
        .send(
            request(Method::POST, "/api/v1/auth/refresh-token").refresh_cookie(&refresh).build(),
        )
        .await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);

    login_via_api(&app, "pw@example.com", "brand-new-1").await;
}

#[tokio::test]
async fn user_directory_is_admin_only() {
    let app = setup_test_app().await;
    register_via_api(&app, "Clerk", "clerk@example.com", "Purchasing").await;
    let (clerk, _) = login_via_api(&app, "clerk@example.com", PASSWORD).await;

    let anonymous = app.send(request(Method::GET, "/api/v1/users").build()).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let forbidden = app.send(request(Method::GET, "/api/v1/users").bearer(&clerk).build()).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden.body["status"], "FORBIDDEN");
}

#[tokio::test]
async fn admin_manages_users() {
    let app = setup_test_app().await;
    register_via_api(&app, "Root", "root@example.com", "Admin").await;
    let target = register_via_api(&app, "Target", "target@example.com", "Warehouse").await;
    register_via_api(&app, "Other", "other@example.com", "Logistics").await;
    let (admin, _) = login_via_api(&app, "root@example.com", PASSWORD).await;
    let (target_access, target_refresh) =
        login_via_api(&app, "target@example.com", PASSWORD).await;
    let target_id = target["id"].as_str().unwrap().to_string();

    let page = app
        .send(request(Method::GET, "/api/v1/users?page=1&limit=2").bearer(&admin).build())
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["data"]["total_items"], 3);
    assert_eq!(page.body["data"]["total_pages"], 2);
    assert_eq!(page.body["data"]["has_next"], true);
    assert_eq!(page.body["data"]["data"].as_array().unwrap().len(), 2);

    let bad_query = app
        .send(request(Method::GET, "/api/v1/users?page=abc").bearer(&admin).build())
        .await;
    assert_eq!(bad_query.status, StatusCode::BAD_REQUEST);

    let bad_id =
        app.send(request(Method::GET, "/api/v1/users/not-a-uuid").bearer(&admin).build()).await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);

    let missing = app
        .send(
            request(Method::GET, &format!("/api/v1/users/{}", UserId::new()))
                .bearer(&admin)
                .build(),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let updated = app
        .send(
            request(Method::PUT, &format!("/api/v1/users/{}", target_id))
                .bearer(&admin)
                .json(json!({ "name": "Promoted", "role": "PPC" }))
                .build(),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(updated.body["data"]["name"], "Promoted");
    assert_eq!(updated.body["data"]["role"], "PPC");

    let clash = app
        .send(
            request(Method::PUT, &format!("/api/v1/users/{}", target_id))
                .bearer(&admin)
                .json(json!({ "email": "other@example.com" }))
                .build(),
        )
        .await;
    assert_eq!(clash.status, StatusCode::CONFLICT);

    let deleted = app
        .send(
            request(Method::DELETE, &format!("/api/v1/users/{}", target_id))
                .bearer(&admin)
                .build(),
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);

    let gone = app
        .send(request(Method::GET, &format!("/api/v1/users/{}", target_id)).bearer(&admin).build())
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    // The deleted account's refresh token died with it; its access token
    // stays valid until expiry but carries no admin rights.
    let stale = app
        .send(
            request(Method::POST, "/api/v1/auth/refresh-token")
                .refresh_cookie(&target_refresh)
                .build(),
        )
        .await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);
    let denied =
        app.send(request(Method::GET, "/api/v1/users").bearer(&target_access).build()).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn end_to_end_session_lifecycle() {
    let app = setup_test_app().await;

    let registered = app
        .send(
            request(Method::POST, "/api/v1/auth/register")
                .json(json!({
                    "name": "Ada",
                    "email": "ada@x.com",
                    "password": "longenough1",
                    "role": "Purchasing"
                }))
                .build(),
        )
        .await;
    assert_eq!(registered.status, StatusCode::CREATED);

    let (_, first_refresh) = login_via_api(&app, "ada@x.com", "longenough1").await;

    let refreshed = app
        .send(
            request(Method::POST, "/api/v1/auth/refresh-token")
                .json(json!({ "refresh_token": first_refresh }))
                .build(),
        )
        .await;
    assert_eq!(refreshed.status, StatusCode::OK);
    let new_access = refreshed.body["data"]["access_token"].as_str().unwrap().to_string();
    let new_refresh = refreshed.body["data"]["refresh_token"].as_str().unwrap().to_string();

    let old = app
        .send(
            request(Method::POST, "/api/v1/auth/refresh-token")
                .json(json!({ "refresh_token": first_refresh }))
                .build(),
        )
        .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);

    let logout =
        app.send(request(Method::POST, "/api/v1/auth/logout").bearer(&new_access).build()).await;
    assert_eq!(logout.status, StatusCode::OK);

    let after_logout = app
        .send(
            request(Method::POST, "/api/v1/auth/refresh-token")
                .json(json!({ "refresh_token": new_refresh }))
                .build(),
        )
        .await;
    assert_eq!(after_logout.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn request_deadline_rolls_back_the_transaction() {
    let app = setup_test_app_with_timeout(Duration::from_millis(200)).await;

    // Hold the SQLite write lock so the registration insert has to wait.
    let mut blocker = app.pool.begin().await.unwrap();
    SqlxUserRepository::new()
        .create_user(
            &mut blocker,
            NewUser {
                id: UserId::new(),
                name: "Blocker".into(),
                email: "blocker@example.com".into(),
                password_hash: "hash".into(),
                role: Role::Warehouse,
            },
        )
        .await
        .unwrap();

    let response = app
        .send(
            request(Method::POST, "/api/v1/auth/register")
                .json(json!({
                    "name": "Late",
                    "email": "late@example.com",
                    "password": PASSWORD,
                    "role": "PPC"
                }))
                .build(),
        )
        .await;
    assert_eq!(response.status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(response.body["code"], 504);

    blocker.rollback().await.unwrap();

    let mut conn = app.pool.acquire().await.unwrap();
    let late = SqlxUserRepository::new().get_user_by_email(&mut conn, "late@example.com").await;
    assert!(late.unwrap().is_none());
}
