//! # Photobook Web Server Library
//!
//! This library provides the core functionality for the Photobook web server.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `session`: Session cookie and request guards
//! - `flash`: One-shot feedback messages
//! - `forms`: Form validation
//! - `templates`: HTML and email templates
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod emails;
pub mod error;
pub mod flash;
pub mod forms;
pub mod middleware;
pub mod multipart;
pub mod routes;
pub mod session;
pub mod templates;
