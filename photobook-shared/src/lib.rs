//! # Photobook Shared Library
//!
//! Domain types and services used by the Photobook web server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `store`: Persistence trait with PostgreSQL and in-memory backends
//! - `auth`: Passwords, session tokens, account links and access policy
//! - `db`: Connection pool and migrations
//! - `mail`: Outbound email
//! - `storage`: Uploaded picture files

pub mod auth;
pub mod db;
pub mod mail;
pub mod models;
pub mod storage;
pub mod store;

/// Current version of the Photobook shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
