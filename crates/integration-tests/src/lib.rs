//! Integration tests for Crime Track.
//!
//! # Running Tests
//!
//! ```bash
//! # Start PostgreSQL, apply migrations and run the API
//! cargo run -p crime-track-cli -- migrate
//! cargo run -p crime-track-api
//!
//! # Run the ignored tests against it
//! cargo test -p crime-track-integration-tests -- --ignored
//! ```
//!
//! Set `API_BASE_URL` to target a server other than `http://localhost:5000`.
//! The server should run with `RATE_LIMIT_ENABLED=false`.

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Header carrying the auth token.
pub const AUTH_HEADER: &str = "x-auth-token";

/// Base URL for the API under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// A unique throwaway email so runs do not collide.
#[must_use]
pub fn unique_email() -> String {
    format!("it-{}@example.com", Uuid::new_v4().simple())
}

/// HTTP client plus the base URL of the running server.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
}

impl TestContext {
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Register a fresh account and return its token.
    ///
    /// # Panics
    ///
    /// Panics if registration does not return 201 with a token.
    pub async fn register(&self, email: &str, password: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/users"))
            .json(&json!({
                "name": "Integration User",
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("Failed to register");

        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = resp.json().await.expect("Failed to parse register body");
        body["token"]
            .as_str()
            .expect("register response has no token")
            .to_string()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
