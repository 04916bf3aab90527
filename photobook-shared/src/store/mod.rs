//! Persistence seam used by the request handlers
//!
//! [`Store`] is the contract every backend implements. Two backends ship with
//! the crate:
//!
//! - [`PgStore`]: PostgreSQL through the model functions in [`crate::models`]
//! - [`MemoryStore`]: process-local maps, for tests and local demos
//!
//! Handlers hold an `Arc<dyn Store>` and never see which one is in use.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Album, CreateAlbum, CreateUser, DeletedAlbum, Image, UpdateAlbum, UpdateUser, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Fields that carry a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

impl UniqueField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UniqueField::Username => "username",
            UniqueField::Email => "email",
        }
    }
}

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique value is already taken
    #[error("{} already exists", .0.as_str())]
    Conflict(UniqueField),

    /// Referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend failure
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.constraint() {
                Some(constraint) if constraint.contains("username") => {
                    StoreError::Conflict(UniqueField::Username)
                }
                Some(constraint) if constraint.contains("email") => {
                    StoreError::Conflict(UniqueField::Email)
                }
                _ => StoreError::Database(db_err.to_string()),
            },
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations needed by the application
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Verifies the backend is reachable
    async fn ping(&self) -> StoreResult<()>;

    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Case-insensitive email lookup
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>>;

    async fn record_login(&self, id: Uuid) -> StoreResult<()>;

    async fn create_album(&self, data: CreateAlbum) -> StoreResult<Album>;

    async fn find_album(&self, id: Uuid) -> StoreResult<Option<Album>>;

    /// Public albums plus the viewer's own, newest first
    async fn list_albums_visible_to(&self, viewer: Option<Uuid>) -> StoreResult<Vec<Album>>;

    async fn list_albums_by_author(
        &self,
        author_id: Uuid,
        include_private: bool,
    ) -> StoreResult<Vec<Album>>;

    async fn update_album(&self, id: Uuid, data: UpdateAlbum) -> StoreResult<Option<Album>>;

    /// Removes an album and all of its images in one step
    async fn delete_album(&self, id: Uuid) -> StoreResult<Option<DeletedAlbum>>;

    async fn add_image(&self, album_id: Uuid, file_path: String) -> StoreResult<Image>;

    async fn find_image(&self, id: Uuid) -> StoreResult<Option<Image>>;

    async fn list_images(&self, album_id: Uuid) -> StoreResult<Vec<Image>>;

    async fn count_images(&self, album_id: Uuid) -> StoreResult<i64>;

    async fn delete_image(&self, id: Uuid) -> StoreResult<Option<Image>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        assert_eq!(
            StoreError::Conflict(UniqueField::Email).to_string(),
            "email already exists"
        );
        assert_eq!(
            StoreError::Conflict(UniqueField::Username).to_string(),
            "username already exists"
        );
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
