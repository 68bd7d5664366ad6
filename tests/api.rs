//! In-process HTTP contract tests. The pool is created lazily and never
//! connects: every request exercised here is decided before storage is
//! touched (health, authentication, role checks, the CAPTCHA gate).

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use serde_json::{json, Value};
use uuid::Uuid;

use felicity_server::auth::issue_access_token;
use felicity_server::config::{AuthConfig, Config, TurnstileConfig};
use felicity_server::routes::create_routes;
use felicity_server::state::AppState;

fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/felicity_test".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        auth: AuthConfig {
            jwt_secret: "api-test-secret".to_string(),
            jwt_refresh_secret: "api-test-refresh-secret".to_string(),
        },
        turnstile: TurnstileConfig {
            secret_key: "unused".to_string(),
            // Never reached: the tests below stop at the missing-token gate.
            verify_url: "http://127.0.0.1:1/siteverify".to_string(),
        },
        smtp: None,
        admin_seed: None,
    }
}

fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        HeaderValue::from_str(&format!("Bearer {token}")).expect("header value"),
    )
}

fn test_server() -> (TestServer, Config) {
    let config = test_config();
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("lazy pool");
    let state = AppState::new(pool, config.clone());
    (
        TestServer::new(create_routes(state)).expect("test server"),
        config,
    )
}

#[tokio::test]
async fn health_check_reports_ok() {
    let (server, _) = test_server();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["service"], json!("felicity-api"));
}

#[tokio::test]
async fn protected_route_without_token_is_unauthorized() {
    let (server, _) = test_server();

    let response = server.get("/api/participant/profile").await;
    response.assert_status_unauthorized();

    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], json!("AUTH_ERROR"));
    assert_eq!(body["error"]["message"], json!("No token provided"));
}

#[tokio::test]
async fn malformed_bearer_token_is_unauthorized() {
    let (server, _) = test_server();

    let response = server
        .get("/api/organizer/events")
        .add_header(
            HeaderName::from_static("authorization"),
            HeaderValue::from_static("Bearer not-a-real-token"),
        )
        .await;
    response.assert_status_unauthorized();

    let body: Value = response.json();
    assert_eq!(body["error"]["code"], json!("AUTH_ERROR"));
}

#[tokio::test]
async fn non_bearer_authorization_header_is_unauthorized() {
    let (server, _) = test_server();

    let response = server
        .get("/api/participant/profile")
        .add_header(
            HeaderName::from_static("authorization"),
            HeaderValue::from_static("Basic abc123"),
        )
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn organizer_token_is_forbidden_on_participant_routes() {
    let (server, config) = test_server();

    let token = issue_access_token(
        &config.auth,
        Uuid::new_v4(),
        "club@x.com",
        "organizer",
        true,
    )
    .unwrap();
    let (name, value) = bearer(&token);

    let response = server
        .get("/api/participant/profile")
        .add_header(name, value)
        .await;
    response.assert_status_forbidden();

    let body: Value = response.json();
    assert_eq!(body["error"]["code"], json!("FORBIDDEN"));
    assert_eq!(
        body["error"]["message"],
        json!("Access denied. Not a participant.")
    );
}

#[tokio::test]
async fn participant_token_is_forbidden_on_admin_routes() {
    let (server, config) = test_server();

    let token = issue_access_token(
        &config.auth,
        Uuid::new_v4(),
        "alice@x.com",
        "iiit",
        true,
    )
    .unwrap();
    let (name, value) = bearer(&token);

    let response = server
        .get("/api/admin/password-resets")
        .add_header(name, value)
        .await;
    response.assert_status_forbidden();

    let body: Value = response.json();
    assert_eq!(body["error"]["message"], json!("Access denied. Admins only."));
}

#[tokio::test]
async fn participant_token_is_forbidden_on_organizer_routes() {
    let (server, config) = test_server();

    let token = issue_access_token(
        &config.auth,
        Uuid::new_v4(),
        "alice@x.com",
        "non-iiit",
        true,
    )
    .unwrap();
    let (name, value) = bearer(&token);

    let response = server
        .post("/api/organizer/events")
        .add_header(name, value)
        .json(&json!({
            "name": "Event",
            "description": "desc",
            "event_type": "normal",
            "registration_deadline": "01/01/2027",
            "start_date": "02/01/2027",
            "end_date": "03/01/2027",
        }))
        .await;
    response.assert_status_forbidden();
}

#[tokio::test]
async fn registration_requires_captcha_token() {
    let (server, _) = test_server();

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "email": "alice@x.com",
            "password": "secret",
            "user_type": "iiit",
        }))
        .await;
    response.assert_status_bad_request();

    let body: Value = response.json();
    assert_eq!(
        body["error"]["message"],
        json!("Cloudflare Turnstile CAPTCHA token is missing.")
    );
}

#[tokio::test]
async fn login_requires_captcha_token_for_non_admin() {
    let (server, _) = test_server();

    let response = server
        .post("/api/auth/login")
        .json(&json!({
            "email": "alice@x.com",
            "password": "secret",
            "user_type": "participant",
        }))
        .await;
    response.assert_status_bad_request();

    let body: Value = response.json();
    assert_eq!(
        body["error"]["message"],
        json!("Cloudflare Turnstile CAPTCHA token is missing.")
    );
}

#[tokio::test]
async fn refresh_rejects_garbage_tokens() {
    let (server, _) = test_server();

    let response = server
        .post("/api/auth/refresh")
        .json(&json!({ "refresh_token": "garbage" }))
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let (server, _) = test_server();

    let response = server.get("/api/unknown").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let (server, _) = test_server();

    let response = server.get("/health").await;
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
}
