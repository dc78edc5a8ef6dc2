//! Token authentication extractor.
//!
//! Protected handlers take [`RequireAuth`], which reads the `x-auth-token`
//! header, verifies the token and loads the account it names.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::Span;

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::state::AppState;

/// Header carrying the auth token.
pub const AUTH_HEADER: &str = "x-auth-token";

/// Rejection body when no token is sent.
pub const NO_TOKEN: &str = "Not authorized, no token!";

/// Rejection body when the token is bad or its account is gone.
pub const TOKEN_FAILED: &str = "Not authorized, token failed!";

/// Extractor that requires a valid auth token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub User);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized(NO_TOKEN.to_string()))?;

        let user_id = state.signer().verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected auth token");
            AppError::Unauthorized(TOKEN_FAILED.to_string())
        })?;

        let user = state
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized(TOKEN_FAILED.to_string()))?;

        Span::current().record("user_id", user.id.as_i32());
        set_sentry_user(user.id.as_i32(), Some(user.email.as_str()));

        Ok(Self(user))
    }
}
