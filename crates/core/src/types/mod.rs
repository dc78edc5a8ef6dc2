//! Core types for Crime Track.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod reset_code;

pub use email::{Email, EmailError};
pub use id::*;
pub use reset_code::{ResetCode, ResetCodeError};
