//! Request ID middleware for request tracing and correlation.

use axum::{
    extract::Request,
    http::{HeaderValue, header::HeaderName},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Ensure every request carries an `x-request-id`.
///
/// An id sent by a proxy is kept; otherwise a UUID v4 is generated. The id is
/// recorded on the request span, tagged on the Sentry scope, forwarded to the
/// handler in the request headers and echoed in the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let header = HeaderName::from_static(REQUEST_ID_HEADER);

    let request_id = request
        .headers()
        .get(&header)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let value = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = value.clone() {
        request.headers_mut().insert(header.clone(), value);
    }

    let mut response = next.run(request).await;

    if let Some(value) = value {
        response.headers_mut().insert(header, value);
    }

    response
}
