//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                   - Banner
//! GET  /health                             - Liveness check
//! GET  /health/ready                       - Readiness check (database)
//!
//! # Accounts (rate limited where marked *)
//! POST /api/users                          - Register *
//! POST /api/users/auth                     - Log in *
//! PUT  /api/users/profile                  - Update name/phone (requires auth)
//! PUT  /api/users/password                 - Change password (requires auth)
//! POST /api/users/logout                   - Clear the jwt cookie
//! POST /api/users/reset-password           - Email a reset code *
//! POST /api/users/verify-code              - Check a reset code *
//! POST /api/users/update-password/{id}/{code} - Set password with a code *
//! PUT  /api/users/image                    - Replace profile image (requires auth)
//!
//! # Case records
//! GET    /api/criminals?keyword=           - List/search (requires auth)
//! POST   /api/criminals                    - Create (requires auth)
//! GET    /api/criminals/{id}               - Show
//! PUT    /api/criminals/{id}               - Update (requires auth)
//! DELETE /api/criminals/{id}               - Delete (requires auth)
//! PUT    /api/criminals/{id}/image         - Replace image (requires auth)
//! ```

pub mod criminals;
pub mod users;

use std::time::Duration;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{
        HeaderName, HeaderValue, Method, Request, Response, StatusCode,
        header::CONTENT_TYPE,
    },
    middleware::from_fn,
    routing::{get, post, put},
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::error::not_found;
use crate::middleware::auth::AUTH_HEADER;
use crate::middleware::request_id::REQUEST_ID_HEADER;
use crate::middleware::{account_rate_limiter, request_id_middleware};
use crate::state::AppState;

/// Request body cap; base64 data URIs for images are large.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Create the account routes router.
///
/// Registration, login and the reset flow sit behind the per-IP limiter when
/// `rate_limited` is set.
pub fn user_routes(rate_limited: bool) -> Router<AppState> {
    let public = Router::new()
        .route("/", post(users::register))
        .route("/auth", post(users::login))
        .route("/reset-password", post(users::request_reset))
        .route("/verify-code", post(users::verify_code))
        .route(
            "/update-password/{id}/{code}",
            post(users::complete_reset),
        );

    let public = if rate_limited {
        public.route_layer(account_rate_limiter())
    } else {
        public
    };

    Router::new()
        .route("/profile", put(users::update_profile))
        .route("/password", put(users::change_password))
        .route("/logout", post(users::logout))
        .route("/image", put(users::upload_image))
        .merge(public)
}

/// Create the case record routes router.
pub fn criminal_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(criminals::index).post(criminals::create))
        .route(
            "/{id}",
            get(criminals::show)
                .put(criminals::update)
                .delete(criminals::delete),
        )
        .route("/{id}/image", put(criminals::upload_image))
}

/// Create all API routes (no middleware).
pub fn routes(rate_limited: bool) -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/users", user_routes(rate_limited))
        .nest("/api/criminals", criminal_routes())
        .fallback(not_found)
}

/// Build the complete application with its middleware stack.
pub fn app(state: AppState) -> Router {
    let rate_limited = state.config().rate_limit_enabled;
    let cors = cors_layer(&state);

    routes(rate_limited)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response<_>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                }),
        )
        .layer(CatchPanicLayer::new())
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Credentialed CORS for the single client origin.
fn cors_layer(state: &AppState) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(AUTH_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .max_age(Duration::from_secs(60 * 60));

    match HeaderValue::from_str(&state.config().cors_origin()) {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            tracing::warn!(error = %e, "CLIENT_URL is not a valid origin; CORS disabled");
            cors
        }
    }
}

/// Banner for `GET /`.
async fn index() -> &'static str {
    " API is up and running... "
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::SERVICE_UNAVAILABLE;
    };

    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header::CONTENT_TYPE},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crime_track_core::Email;

    use crate::config::ApiConfig;
    use crate::db::UserStore;
    use crate::middleware::auth::AUTH_HEADER;
    use crate::models::User;
    use crate::services::email::tests::RecordingMailer;
    use crate::state::AppState;
    use crate::state::tests::TestDeps;

    /// The full router over in-memory backends.
    pub(crate) struct TestApp {
        pub deps: TestDeps,
        pub state: AppState,
        router: Router,
    }

    impl TestApp {
        pub(crate) fn new() -> Self {
            Self::from_deps(TestDeps::default())
        }

        pub(crate) fn with_failing_mailer() -> Self {
            Self::from_deps(TestDeps {
                mailer: Arc::new(RecordingMailer::failing()),
                ..TestDeps::default()
            })
        }

        /// Same backends, with the per-IP limiter on the public account routes.
        pub(crate) fn with_rate_limit() -> Self {
            let deps = TestDeps::default();
            let mut config = ApiConfig::for_tests();
            config.rate_limit_enabled = true;
            let state = deps.state_with(config);
            Self::from_state(deps, state)
        }

        fn from_deps(deps: TestDeps) -> Self {
            let state = deps.state();
            Self::from_state(deps, state)
        }

        fn from_state(deps: TestDeps, state: AppState) -> Self {
            let router = super::app(state.clone());
            Self {
                deps,
                state,
                router,
            }
        }

        pub(crate) async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }

        async fn send_json(
            &self,
            method: Method,
            uri: &str,
            body: Option<Value>,
            token: Option<&str>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(AUTH_HEADER, token);
            }
            let request = match body {
                Some(body) => builder
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.send(request).await;
            let status = response.status();
            (status, body_value(response).await)
        }

        pub(crate) async fn post_json(
            &self,
            uri: &str,
            body: Value,
            token: Option<&str>,
        ) -> (StatusCode, Value) {
            self.send_json(Method::POST, uri, Some(body), token).await
        }

        pub(crate) async fn put_json(
            &self,
            uri: &str,
            body: Value,
            token: Option<&str>,
        ) -> (StatusCode, Value) {
            self.send_json(Method::PUT, uri, Some(body), token).await
        }

        pub(crate) async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
            self.send_json(Method::GET, uri, None, token).await
        }

        pub(crate) async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
            self.send_json(Method::DELETE, uri, None, token).await
        }

        pub(crate) async fn raw_post_json(&self, uri: &str, body: Value) -> Response {
            let request = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            self.send(request).await
        }

        pub(crate) async fn user_by_email(&self, email: &str) -> User {
            self.deps
                .users
                .find_by_email(&Email::parse(email).unwrap())
                .await
                .unwrap()
                .unwrap()
        }
    }

    /// JSON bodies parse as JSON; plain-text error bodies become `Value::String`.
    pub(crate) async fn body_value(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Register "Test User" and return their token.
    pub(crate) async fn register(app: &TestApp, email: &str, password: &str) -> String {
        let (status, body) = app
            .post_json(
                "/api/users",
                serde_json::json!({
                    "name": "Test User",
                    "email": email,
                    "password": password,
                }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    use super::test_support::TestApp;
    use crate::middleware::request_id::REQUEST_ID_HEADER;

    #[tokio::test]
    async fn test_index_banner() {
        let app = TestApp::new();
        let (status, body) = app.get("/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, " API is up and running... ");
    }

    #[tokio::test]
    async fn test_health_and_readiness_without_database() {
        let app = TestApp::new();

        let (status, body) = app.get("/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");

        let (status, _) = app.get("/health/ready", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_route_falls_back_to_not_found() {
        let app = TestApp::new();
        let (status, body) = app.get("/api/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Not Found - /api/nope");
    }

    #[tokio::test]
    async fn test_request_id_is_echoed_or_generated() {
        let app = TestApp::new();

        let response = app
            .send(
                Request::builder()
                    .uri("/health")
                    .header(REQUEST_ID_HEADER, "trace-me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-me");

        let response = app
            .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await;
        let generated = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert_eq!(generated.len(), 36);
    }

    fn from_client(method: &str, uri: &str, ip: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(ip) = ip {
            builder = builder.header("x-forwarded-for", ip);
        }
        builder
            .body(Body::from(r#"{"email":"nobody@example.com","password":"guess1"}"#))
            .unwrap()
    }

    #[tokio::test]
    async fn test_account_routes_are_limited_per_client_ip() {
        let app = TestApp::with_rate_limit();
        let ip = Some("203.0.113.9");

        let mut statuses = Vec::new();
        for _ in 0..6 {
            let response = app.send(from_client("POST", "/api/users/auth", ip)).await;
            statuses.push(response.status());
        }
        assert_eq!(&statuses[..5], &[StatusCode::BAD_REQUEST; 5]);
        assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);

        // Another client still has its own burst.
        let response = app
            .send(from_client("POST", "/api/users/auth", Some("198.51.100.4")))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Authenticated account routes sit outside the limiter.
        for _ in 0..10 {
            let response = app.send(from_client("PUT", "/api/users/profile", ip)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_limited_route_without_client_ip_is_server_error() {
        let app = TestApp::with_rate_limit();
        let response = app.send(from_client("POST", "/api/users/auth", None)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = app.send(from_client("PUT", "/api/users/profile", None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cors_allows_client_origin() {
        let app = TestApp::new();
        let origin = app.state.config().cors_origin();

        let response = app
            .send(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/criminals")
                    .header("origin", &origin)
                    .header("access-control-request-method", "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            origin.as_str()
        );
        assert_eq!(
            response.headers()["access-control-allow-credentials"],
            "true"
        );
    }
}
