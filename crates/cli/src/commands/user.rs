//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! CRIME_TRACK_PASSWORD=... crime-track user create -n "Desk Officer" -e desk@example.com -p 555-0100
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `CRIME_TRACK_PASSWORD` - Password for the new account (kept off the
//!   command line so it never lands in shell history)

use thiserror::Error;

use crime_track_api::db::{RepositoryError, UserRepository, UserStore};
use crime_track_api::models::NewUser;
use crime_track_api::services::auth::{self, AuthError};
use crime_track_core::{Email, UserId};

use super::{CommandError, database_url};

const PASSWORD_VAR: &str = "CRIME_TRACK_PASSWORD";

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Name must not be empty")]
    EmptyName,

    #[error(transparent)]
    Password(#[from] AuthError),

    #[error("User already exists with email: {0}")]
    UserExists(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Create an account directly in the database.
///
/// # Returns
///
/// The ID of the created account.
pub async fn create(name: &str, email: &str, phone: Option<String>) -> Result<UserId, UserError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(UserError::EmptyName);
    }
    let email = Email::parse(email).map_err(|_| UserError::InvalidEmail(email.to_owned()))?;

    let url = database_url()?;
    let password = std::env::var(PASSWORD_VAR)
        .map_err(|_| CommandError::MissingEnvVar(PASSWORD_VAR))?;
    auth::validate_password(&password)?;
    let password_hash = auth::hash_password(&password)?;

    tracing::info!("Connecting to database...");
    let pool = crime_track_api::db::create_pool(&url)
        .await
        .map_err(CommandError::from)?;
    let users = UserRepository::new(pool);

    tracing::info!("Creating user: {}", email);

    let user = users
        .create(NewUser {
            name: name.to_owned(),
            email: email.clone(),
            password_hash,
            phone_number: phone.filter(|p| !p.trim().is_empty()),
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => UserError::UserExists(email.to_string()),
            other => UserError::Repository(other),
        })?;

    tracing::info!("User created successfully! ID: {}, Email: {}", user.id, user.email);
    Ok(user.id)
}
