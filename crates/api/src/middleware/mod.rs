//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction tracing)
//! 2. `CatchPanicLayer` (handler panics become 500)
//! 3. `TraceLayer` (request span with method, URI, status, latency)
//! 4. Request ID (add unique ID to each request)
//! 5. CORS (single credentialed client origin)
//! 6. Body limit
//! 7. Rate limiting on public account endpoints (governor)
//!
//! Authentication is an extractor ([`RequireAuth`]) rather than a layer so
//! public and protected handlers can share a path.

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::RequireAuth;
pub use rate_limit::account_rate_limiter;
pub use request_id::request_id_middleware;
