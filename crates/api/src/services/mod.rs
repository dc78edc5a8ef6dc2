//! Business logic services.
//!
//! # Services
//!
//! - `accounts` - Registration, login, profile, password reset flow
//! - `auth` - Password hashing and signed auth tokens
//! - `criminals` - Case record operations
//! - `email` - Email delivery via SMTP
//! - `images` - Hosted images via Cloudinary

pub mod accounts;
pub mod auth;
pub mod criminals;
pub mod email;
pub mod images;

pub use accounts::{AccountError, AccountService};
pub use auth::{AuthError, TokenSigner};
pub use criminals::{CriminalError, CriminalService};
pub use email::{EmailError, EmailService, Mailer};
pub use images::{CloudinaryClient, ImageHost, ImageHostError, UploadedImage};
