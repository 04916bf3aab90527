/// Middleware modules for the web server
///
/// This module contains custom middleware for:
/// - Security headers

pub mod security;
