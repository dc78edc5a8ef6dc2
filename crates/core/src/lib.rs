//! Crime Track Core - Shared types library.
//!
//! This crate provides the domain types shared by the Crime Track crates:
//! - `api` - The HTTP service for case records and user accounts
//! - `cli` - Migrations and account management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Database encoding is available behind the `postgres`
//! feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, validated email addresses, one-time reset codes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
