//! In-memory store
//!
//! Mirrors the PostgreSQL backend's rules (unique username/email, lowercase
//! email, album cascade) so handler tests exercise the same behavior without
//! a database. Data lives for the lifetime of the process.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, UniqueField};
use crate::models::user::normalize_email;
use crate::models::{
    Album, CreateAlbum, CreateUser, DeletedAlbum, Image, UpdateAlbum, UpdateUser, User,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    albums: HashMap<Uuid, Album>,
    images: HashMap<Uuid, Image>,
}

impl Tables {
    fn check_unique(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        except: Option<Uuid>,
    ) -> StoreResult<()> {
        for user in self.users.values() {
            if Some(user.id) == except {
                continue;
            }
            if username.is_some_and(|u| u == user.username) {
                return Err(StoreError::Conflict(UniqueField::Username));
            }
            if email.is_some_and(|e| normalize_email(e) == user.email) {
                return Err(StoreError::Conflict(UniqueField::Email));
            }
        }
        Ok(())
    }
}

/// Process-local [`Store`] implementation
///
/// [`MemoryStore::with_image_limit`] caps the number of image rows so tests
/// can drive the insert-failure paths.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    image_limit: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects `add_image` once `limit` image rows exist
    pub fn with_image_limit(limit: usize) -> Self {
        Self {
            image_limit: Some(limit),
            ..Self::default()
        }
    }

    /// Total image rows, regardless of album
    pub async fn image_count(&self) -> usize {
        self.tables.read().await.images.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        tables.check_unique(Some(&data.username), Some(&data.email), None)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: data.username,
            email: normalize_email(&data.email),
            password_hash: data.password_hash,
            is_active: data.is_active,
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            avatar_path: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&id) {
            return Ok(None);
        }
        tables.check_unique(data.username.as_deref(), data.email.as_deref(), Some(id))?;

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = data.username {
            user.username = username;
        }
        if let Some(email) = data.email {
            user.email = normalize_email(&email);
        }
        if let Some(password_hash) = data.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(is_active) = data.is_active {
            user.is_active = is_active;
        }
        if let Some(first_name) = data.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = data.last_name {
            user.last_name = last_name;
        }
        if let Some(bio) = data.bio {
            user.bio = bio;
        }
        if let Some(avatar_path) = data.avatar_path {
            user.avatar_path = avatar_path;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        if let Some(user) = self.tables.write().await.users.get_mut(&id) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn create_album(&self, data: CreateAlbum) -> StoreResult<Album> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&data.author_id) {
            return Err(StoreError::NotFound(format!("user {}", data.author_id)));
        }

        let album = Album {
            id: Uuid::new_v4(),
            name: data.name,
            age: data.age,
            description: data.description,
            title: data.title,
            location: data.location,
            banner_path: data.banner_path,
            author_id: Some(data.author_id),
            visibility: data.visibility,
            created_at: Utc::now(),
        };
        tables.albums.insert(album.id, album.clone());

        Ok(album)
    }

    async fn find_album(&self, id: Uuid) -> StoreResult<Option<Album>> {
        Ok(self.tables.read().await.albums.get(&id).cloned())
    }

    async fn list_albums_visible_to(&self, viewer: Option<Uuid>) -> StoreResult<Vec<Album>> {
        let tables = self.tables.read().await;
        let mut albums: Vec<Album> = tables
            .albums
            .values()
            .filter(|a| a.is_public() || viewer.is_some_and(|v| a.is_owned_by(v)))
            .cloned()
            .collect();
        albums.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(albums)
    }

    async fn list_albums_by_author(
        &self,
        author_id: Uuid,
        include_private: bool,
    ) -> StoreResult<Vec<Album>> {
        let tables = self.tables.read().await;
        let mut albums: Vec<Album> = tables
            .albums
            .values()
            .filter(|a| a.is_owned_by(author_id) && (include_private || a.is_public()))
            .cloned()
            .collect();
        albums.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(albums)
    }

    async fn update_album(&self, id: Uuid, data: UpdateAlbum) -> StoreResult<Option<Album>> {
        let mut tables = self.tables.write().await;
        let Some(album) = tables.albums.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = data.name {
            album.name = name;
        }
        if let Some(age) = data.age {
            album.age = age;
        }
        if let Some(description) = data.description {
            album.description = description;
        }
        if let Some(title) = data.title {
            album.title = title;
        }
        if let Some(location) = data.location {
            album.location = location;
        }
        if let Some(banner_path) = data.banner_path {
            album.banner_path = banner_path;
        }
        if let Some(visibility) = data.visibility {
            album.visibility = visibility;
        }

        Ok(Some(album.clone()))
    }

    async fn delete_album(&self, id: Uuid) -> StoreResult<Option<DeletedAlbum>> {
        let mut tables = self.tables.write().await;
        let Some(album) = tables.albums.remove(&id) else {
            return Ok(None);
        };

        let image_ids: Vec<Uuid> = tables
            .images
            .values()
            .filter(|image| image.album_id == Some(id))
            .map(|image| image.id)
            .collect();
        let mut images: Vec<Image> = image_ids
            .iter()
            .filter_map(|image_id| tables.images.remove(image_id))
            .collect();
        images.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(Some(DeletedAlbum { album, images }))
    }

    async fn add_image(&self, album_id: Uuid, file_path: String) -> StoreResult<Image> {
        let mut tables = self.tables.write().await;
        if !tables.albums.contains_key(&album_id) {
            return Err(StoreError::NotFound(format!("album {}", album_id)));
        }
        if self.image_limit.is_some_and(|limit| tables.images.len() >= limit) {
            return Err(StoreError::Database("image limit reached".to_string()));
        }

        let image = Image {
            id: Uuid::new_v4(),
            album_id: Some(album_id),
            file_path,
            created_at: Utc::now(),
        };
        tables.images.insert(image.id, image.clone());

        Ok(image)
    }

    async fn find_image(&self, id: Uuid) -> StoreResult<Option<Image>> {
        Ok(self.tables.read().await.images.get(&id).cloned())
    }

    async fn list_images(&self, album_id: Uuid) -> StoreResult<Vec<Image>> {
        let tables = self.tables.read().await;
        let mut images: Vec<Image> = tables
            .images
            .values()
            .filter(|image| image.album_id == Some(album_id))
            .cloned()
            .collect();
        images.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(images)
    }

    async fn count_images(&self, album_id: Uuid) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .images
            .values()
            .filter(|image| image.album_id == Some(album_id))
            .count();
        Ok(count as i64)
    }

    async fn delete_image(&self, id: Uuid) -> StoreResult<Option<Image>> {
        Ok(self.tables.write().await.images.remove(&id))
    }
}
