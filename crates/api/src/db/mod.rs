//! Database access for the API.
//!
//! # Tables
//!
//! - `users` - Accounts (unique email, argon2id password hash, profile image)
//! - `criminals` - Case records
//! - `password_reset_tokens` - At most one outstanding reset code per user
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p crime-track-cli -- migrate
//! ```
//!
//! Handlers talk to the stores through the traits below so router tests can
//! swap in the in-memory implementations from [`memory`].

pub mod criminals;
#[cfg(test)]
pub mod memory;
pub mod reset_tokens;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crime_track_core::{CriminalId, Email, ResetCode, UserId};

use crate::models::{Criminal, CriminalSearch, NewUser, PasswordResetToken, User};

pub use criminals::CriminalRepository;
pub use reset_tokens::ResetTokenRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up an account by id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Look up an account by its normalized email.
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Insert a new account.
    ///
    /// Fails with [`RepositoryError::Conflict`] when the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Persist the mutable fields of `user` and bump `updated_at`.
    async fn save(&self, user: &User) -> Result<User, RepositoryError>;
}

/// Case record persistence.
#[async_trait]
pub trait CriminalStore: Send + Sync {
    /// All records matching `search` (or all records), newest update first.
    async fn list(&self, search: Option<&CriminalSearch>)
    -> Result<Vec<Criminal>, RepositoryError>;

    async fn find_by_id(&self, id: CriminalId) -> Result<Option<Criminal>, RepositoryError>;

    /// Insert a record with only its name set.
    async fn create(&self, name: &str) -> Result<Criminal, RepositoryError>;

    /// Persist every field of `criminal` and bump `updated_at`.
    async fn save(&self, criminal: &Criminal) -> Result<Criminal, RepositoryError>;

    /// Delete a record. Returns `false` if it did not exist.
    async fn delete(&self, id: CriminalId) -> Result<bool, RepositoryError>;
}

/// Password reset token persistence.
#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    async fn find_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<PasswordResetToken>, RepositoryError>;

    /// Insert a token. Fails with [`RepositoryError::Conflict`] if the user
    /// already has one outstanding.
    async fn insert(&self, token: &PasswordResetToken) -> Result<(), RepositoryError>;

    /// Remove the user's token, if any.
    async fn delete_for_user(&self, user_id: UserId) -> Result<(), RepositoryError>;

    /// Delete the user's token only if it carries `code`, in one step.
    ///
    /// Returns `true` for exactly one caller per issued code.
    async fn consume(&self, user_id: UserId, code: &ResetCode) -> Result<bool, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_string());
    }
    RepositoryError::Database(err)
}
