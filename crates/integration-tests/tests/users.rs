//! Integration tests for account endpoints.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The API server running with `RATE_LIMIT_ENABLED=false`
//!
//! Run with: cargo test -p crime-track-integration-tests -- --ignored

use crime_track_integration_tests::{AUTH_HEADER, TestContext, unique_email};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_health_endpoints() {
    let ctx = TestContext::new();

    let resp = ctx.client.get(ctx.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ctx.client.get(ctx.url("/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_register_then_login() {
    let ctx = TestContext::new();
    let email = unique_email();
    ctx.register(&email, "integration1").await;

    let resp = ctx
        .client
        .post(ctx.url("/api/users"))
        .json(&json!({"name": "Dup", "email": email, "password": "integration1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), "User already exists!");

    let resp = ctx
        .client
        .post(ctx.url("/api/users/auth"))
        .json(&json!({"email": email, "password": "integration1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["email"], email.as_str());

    let resp = ctx
        .client
        .post(ctx.url("/api/users/auth"))
        .json(&json!({"email": email, "password": "wrong-one"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_change_password_round_trip() {
    let ctx = TestContext::new();
    let email = unique_email();
    let token = ctx.register(&email, "integration1").await;

    let resp = ctx
        .client
        .put(ctx.url("/api/users/password"))
        .header(AUTH_HEADER, &token)
        .json(&json!({
            "currentPassword": "integration1",
            "newPassword": "integration2",
            "confirmPassword": "integration2",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ctx
        .client
        .post(ctx.url("/api/users/auth"))
        .json(&json!({"email": email, "password": "integration2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
}
