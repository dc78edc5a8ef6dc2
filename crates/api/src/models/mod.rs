//! Domain models.
//!
//! These types represent validated domain objects separate from database row types.

pub mod criminal;
pub mod reset_token;
pub mod user;

pub use criminal::{Criminal, CriminalSearch, CriminalUpdate};
pub use reset_token::PasswordResetToken;
pub use user::{NewUser, User};
