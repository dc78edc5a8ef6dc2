//! User account domain types.

use chrono::{DateTime, Utc};

use crime_track_core::{Email, UserId};

/// A registered account (domain type).
///
/// `Debug` is implemented by hand so the password hash never reaches logs.
#[derive(Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email (unique, normalized).
    pub email: Email,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Optional contact number.
    pub phone_number: Option<String>,
    /// Hosted profile image URL.
    pub image: Option<String>,
    /// Image host asset id for `image`, used to destroy it on replacement.
    pub image_id: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("phone_number", &self.phone_number)
            .field("image", &self.image)
            .field("image_id", &self.image_id)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Fields required to create an account.
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub phone_number: Option<String>,
}
