//! Authentication error types.

use thiserror::Error;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] crime_track_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token is not three base64url segments with JSON header and claims.
    #[error("malformed token")]
    MalformedToken,

    /// Token header names an algorithm other than HS256.
    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Token signature does not match.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Token is past its `exp` claim.
    #[error("token expired")]
    TokenExpired,

    /// Signing key could not be initialized.
    #[error("token signing failed")]
    Signing,
}

impl AuthError {
    /// Whether this error means the presented token must be rejected.
    #[must_use]
    pub const fn is_token_failure(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken
                | Self::UnsupportedAlgorithm(_)
                | Self::InvalidSignature
                | Self::TokenExpired
        )
    }
}
