//! Integration tests for case record endpoints.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The API server running with `RATE_LIMIT_ENABLED=false`
//!
//! Run with: cargo test -p crime-track-integration-tests -- --ignored

use crime_track_integration_tests::{AUTH_HEADER, TestContext, unique_email};
use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_record_lifecycle() {
    let ctx = TestContext::new();
    let token = ctx.register(&unique_email(), "integration1").await;
    let marker = format!("Marker {}", Uuid::new_v4().simple());

    let resp = ctx
        .client
        .post(ctx.url("/api/criminals"))
        .header(AUTH_HEADER, &token)
        .json(&json!({"name": "Integration Suspect"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await.unwrap();
    let id = created["_id"].as_i64().unwrap();

    let resp = ctx
        .client
        .put(ctx.url(&format!("/api/criminals/{id}")))
        .header(AUTH_HEADER, &token)
        .json(&json!({"charges": marker, "alias": "Ghost"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ctx
        .client
        .get(ctx.url("/api/criminals"))
        .header(AUTH_HEADER, &token)
        .query(&[("keyword", marker.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let found: Value = resp.json().await.unwrap();
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["name"], "Integration Suspect");
    assert_eq!(found[0]["alias"], "Ghost");

    let resp = ctx
        .client
        .delete(ctx.url(&format!("/api/criminals/{id}")))
        .header(AUTH_HEADER, &token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/criminals/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_list_requires_token() {
    let ctx = TestContext::new();

    let resp = ctx
        .client
        .get(ctx.url("/api/criminals"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.text().await.unwrap(), "Not authorized, no token!");
}
