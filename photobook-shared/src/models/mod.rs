//! Database models for Photobook
//!
//! Each model exposes associated async functions that take a `&PgPool`.
//! Request handlers normally go through [`crate::store::Store`] instead of
//! calling these directly.
//!
//! # Models
//!
//! - `user`: Accounts, credentials and profile fields
//! - `album`: Photo albums with visibility
//! - `image`: Pictures that belong to an album

pub mod album;
pub mod image;
pub mod user;

pub use album::{Album, CreateAlbum, DeletedAlbum, UpdateAlbum, Visibility};
pub use image::Image;
pub use user::{CreateUser, UpdateUser, User};
