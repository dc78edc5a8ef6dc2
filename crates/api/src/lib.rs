//! Crime Track API library.
//!
//! The HTTP service for criminal case records and the user accounts that
//! manage them, exposed as a library so the router can be tested in-process.
//!
//! # Architecture
//!
//! - Axum handlers in [`routes`] validate input and shape responses
//! - [`services`] hold the account and record rules
//! - [`db`] stores (`PostgreSQL` in production, in-memory in tests)
//! - SMTP via lettre for reset codes, Cloudinary for images

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
