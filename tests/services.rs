//! Outbound-service client tests against a local wiremock server.

use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::types::Json as SqlJson;
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use felicity_server::config::TurnstileConfig;
use felicity_server::models::{Event, EventDetails};
use felicity_server::services::captcha::{require_captcha, verify_turnstile};
use felicity_server::services::discord::notify_event_published;

fn turnstile_config(server: &MockServer) -> TurnstileConfig {
    TurnstileConfig {
        secret_key: "test-secret".to_string(),
        verify_url: format!("{}/siteverify", server.uri()),
    }
}

#[tokio::test]
async fn turnstile_accepts_successful_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/siteverify"))
        .and(body_string_contains("secret=test-secret"))
        .and(body_string_contains("response=the-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let config = turnstile_config(&server);
    assert!(verify_turnstile(&http, &config, "the-token").await);
    assert!(require_captcha(&http, &config, Some("the-token")).await.is_ok());
}

#[tokio::test]
async fn turnstile_rejects_failed_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/siteverify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let config = turnstile_config(&server);
    assert!(!verify_turnstile(&http, &config, "bad-token").await);

    let err = require_captcha(&http, &config, Some("bad-token"))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Validation error: CAPTCHA verification failed. Please try again."
    );
}

#[tokio::test]
async fn turnstile_degrades_to_unverified_on_transport_error() {
    // Nothing is listening here.
    let config = TurnstileConfig {
        secret_key: "test-secret".to_string(),
        verify_url: "http://127.0.0.1:1/siteverify".to_string(),
    };
    let http = reqwest::Client::new();
    assert!(!verify_turnstile(&http, &config, "any-token").await);
}

#[tokio::test]
async fn missing_captcha_token_never_reaches_the_verifier() {
    let server = MockServer::start().await;
    // No mock mounted: a request would 404 and the test would still pass,
    // but the expectation below pins the count to zero.
    let http = reqwest::Client::new();
    let config = turnstile_config(&server);

    let err = require_captcha(&http, &config, None).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Validation error: Cloudflare Turnstile CAPTCHA token is missing."
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

fn sample_event() -> Event {
    Event {
        id: Uuid::new_v4(),
        organizer_id: Uuid::new_v4(),
        name: "Intro to Rust".to_string(),
        description: "A workshop".to_string(),
        event_type: "normal".to_string(),
        eligibility: None,
        registration_deadline: Utc::now(),
        start_date: Utc::now(),
        end_date: Utc::now(),
        registration_limit: Some(50),
        registration_fee: Decimal::ZERO,
        tags: None,
        status: "Published".to_string(),
        views: 0,
        details: SqlJson(EventDetails::Form {
            custom_fields: vec![],
        }),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn discord_notification_posts_to_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    notify_event_published(
        reqwest::Client::new(),
        format!("{}/webhook", server.uri()),
        &sample_event(),
        "Coding Club",
    );

    // The post runs detached; give it a moment before the mock verifies.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body["content"]
        .as_str()
        .unwrap()
        .contains("Coding Club"));
    assert_eq!(body["embeds"][0]["title"], json!("Intro to Rust"));
}

#[tokio::test]
async fn discord_notification_skips_empty_webhook() {
    let server = MockServer::start().await;

    notify_event_published(
        reqwest::Client::new(),
        String::new(),
        &sample_event(),
        "Coding Club",
    );
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(server.received_requests().await.unwrap().is_empty());
}
