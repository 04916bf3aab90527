//! PostgreSQL store backed by the model functions

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreResult};
use crate::db::pool::health_check;
use crate::models::{
    Album, CreateAlbum, CreateUser, DeletedAlbum, Image, UpdateAlbum, UpdateUser, User,
};

/// Store implementation over a sqlx connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for migrations and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_username(&self.pool, username).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        Ok(User::update(&self.pool, id, data).await?)
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        User::update_last_login(&self.pool, id).await?;
        Ok(())
    }

    async fn create_album(&self, data: CreateAlbum) -> StoreResult<Album> {
        Ok(Album::create(&self.pool, data).await?)
    }

    async fn find_album(&self, id: Uuid) -> StoreResult<Option<Album>> {
        Ok(Album::find_by_id(&self.pool, id).await?)
    }

    async fn list_albums_visible_to(&self, viewer: Option<Uuid>) -> StoreResult<Vec<Album>> {
        Ok(Album::list_visible_to(&self.pool, viewer).await?)
    }

    async fn list_albums_by_author(
        &self,
        author_id: Uuid,
        include_private: bool,
    ) -> StoreResult<Vec<Album>> {
        Ok(Album::list_by_author(&self.pool, author_id, include_private).await?)
    }

    async fn update_album(&self, id: Uuid, data: UpdateAlbum) -> StoreResult<Option<Album>> {
        Ok(Album::update(&self.pool, id, data).await?)
    }

    async fn delete_album(&self, id: Uuid) -> StoreResult<Option<DeletedAlbum>> {
        Ok(Album::delete_with_images(&self.pool, id).await?)
    }

    async fn add_image(&self, album_id: Uuid, file_path: String) -> StoreResult<Image> {
        Ok(Image::create(&self.pool, album_id, file_path).await?)
    }

    async fn find_image(&self, id: Uuid) -> StoreResult<Option<Image>> {
        Ok(Image::find_by_id(&self.pool, id).await?)
    }

    async fn list_images(&self, album_id: Uuid) -> StoreResult<Vec<Image>> {
        Ok(Image::list_by_album(&self.pool, album_id).await?)
    }

    async fn count_images(&self, album_id: Uuid) -> StoreResult<i64> {
        Ok(Image::count_by_album(&self.pool, album_id).await?)
    }

    async fn delete_image(&self, id: Uuid) -> StoreResult<Option<Image>> {
        Ok(Image::delete(&self.pool, id).await?)
    }
}
