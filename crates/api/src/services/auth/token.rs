//! Signed auth tokens.
//!
//! Tokens are compact JWTs (`header.claims.signature`, base64url without
//! padding) signed with HMAC-SHA256. Only `HS256` is accepted on verify.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crime_track_core::UserId;

use super::AuthError;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Claims carried by an auth token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// Issues and verifies auth tokens with a server-side secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: SecretString,
    ttl_days: i64,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[REDACTED]")
            .field("ttl_days", &self.ttl_days)
            .finish()
    }
}

impl TokenSigner {
    /// Create a signer whose tokens live for `ttl_days`.
    #[must_use]
    pub const fn new(secret: SecretString, ttl_days: i64) -> Self {
        Self { secret, ttl_days }
    }

    /// Issue a token for `user_id`, valid from now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if the HMAC key cannot be initialized or
    /// the expiry falls outside the representable time range.
    pub fn issue(&self, user_id: UserId) -> Result<String, AuthError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if the HMAC key cannot be initialized or
    /// the expiry falls outside the representable time range.
    pub fn issue_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, AuthError> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let claims = Claims {
            user_id,
            iat: now.timestamp(),
            exp: self.expiry_from(now)?.timestamp(),
        };

        let header = serde_json::to_vec(&header).map_err(|_| AuthError::Signing)?;
        let claims = serde_json::to_vec(&claims).map_err(|_| AuthError::Signing)?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        );

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify `token` and return the user it was issued for.
    ///
    /// # Errors
    ///
    /// Returns a token failure (`MalformedToken`, `UnsupportedAlgorithm`,
    /// `InvalidSignature`, `TokenExpired`) when the token must be rejected.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify `token` as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// See [`TokenSigner::verify`].
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, AuthError> {
        let mut parts = token.trim().split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::MalformedToken);
        };

        let header: Header = decode_segment(header_b64)?;
        if header.alg != ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::MalformedToken)?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        // verify_slice compares in constant time
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        let claims: Claims = decode_segment(claims_b64)?;
        if now.timestamp() >= claims.exp {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims.user_id)
    }

    /// `now` plus the token lifetime; an out-of-range lifetime is a signing error.
    fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, AuthError> {
        TimeDelta::try_days(self.ttl_days)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(AuthError::Signing)
    }

    fn mac(&self) -> Result<Hmac<Sha256>, AuthError> {
        Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| AuthError::Signing)
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::MalformedToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken)
}
