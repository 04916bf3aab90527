/// Album model and database operations
///
/// An album belongs to one author and owns zero or more images. Removing an
/// album goes through [`Album::delete_with_images`], which deletes the image
/// rows and the album row together and hands back the file paths that must be
/// cleaned up from storage.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE albums (
///     id UUID PRIMARY KEY,
///     name VARCHAR(700) NOT NULL,
///     age VARCHAR(20),
///     description VARCHAR(700) NOT NULL,
///     title VARCHAR(700) NOT NULL,
///     location VARCHAR(700) NOT NULL,
///     banner_path VARCHAR(512) NOT NULL,
///     author_id UUID REFERENCES users(id) ON DELETE CASCADE,
///     visibility VARCHAR(10) NOT NULL DEFAULT 'public',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::image::Image;

const ALBUM_COLUMNS: &str =
    "id, name, age, description, title, location, banner_path, author_id, visibility, created_at";

/// Who may see an album
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Listed and readable by everyone
    #[default]
    Public,

    /// Readable by the author only
    Private,
}

impl Visibility {
    /// Converts visibility to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    /// Human readable label used in forms
    pub fn label(&self) -> &'static str {
        match self {
            Visibility::Public => "Public",
            Visibility::Private => "Private",
        }
    }

    pub fn all() -> [Visibility; 2] {
        [Visibility::Public, Visibility::Private]
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored or submitted visibility is not recognized
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown visibility: {0}")]
pub struct UnknownVisibility(pub String);

impl FromStr for Visibility {
    type Err = UnknownVisibility;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(UnknownVisibility(other.to_string())),
        }
    }
}

impl TryFrom<String> for Visibility {
    type Error = UnknownVisibility;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Photo album
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Album {
    pub id: Uuid,

    pub name: String,

    /// Free-form age / era label, e.g. "2019" or "childhood"
    pub age: Option<String>,

    pub description: String,

    pub title: String,

    pub location: String,

    /// Stored banner image, relative to the media root
    pub banner_path: String,

    /// Owning user; None only for rows orphaned outside the application
    pub author_id: Option<Uuid>,

    #[sqlx(try_from = "String")]
    pub visibility: Visibility,

    pub created_at: DateTime<Utc>,
}

impl Album {
    /// Returns true if `user_id` authored this album
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.author_id == Some(user_id)
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

/// Input for creating a new album
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAlbum {
    pub name: String,
    pub age: Option<String>,
    pub description: String,
    pub title: String,
    pub location: String,
    pub banner_path: String,
    pub author_id: Uuid,
    pub visibility: Visibility,
}

/// Input for updating an album
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAlbum {
    pub name: Option<String>,

    /// New age label (use Some(None) to clear)
    pub age: Option<Option<String>>,

    pub description: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub banner_path: Option<String>,
    pub visibility: Option<Visibility>,
}

/// Result of removing an album together with its images
#[derive(Debug, Clone)]
pub struct DeletedAlbum {
    pub album: Album,
    pub images: Vec<Image>,
}

impl DeletedAlbum {
    /// Every stored file that belonged to the album
    pub fn file_paths(&self) -> Vec<String> {
        std::iter::once(self.album.banner_path.clone())
            .chain(self.images.iter().map(|image| image.file_path.clone()))
            .collect()
    }
}

impl Album {
    /// Creates a new album
    pub async fn create(pool: &PgPool, data: CreateAlbum) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO albums (id, name, age, description, title, location, banner_path, author_id, visibility) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {ALBUM_COLUMNS}"
        );

        let album = sqlx::query_as::<_, Album>(&query)
            .bind(Uuid::new_v4())
            .bind(data.name)
            .bind(data.age)
            .bind(data.description)
            .bind(data.title)
            .bind(data.location)
            .bind(data.banner_path)
            .bind(data.author_id)
            .bind(data.visibility.as_str())
            .fetch_one(pool)
            .await?;

        Ok(album)
    }

    /// Finds an album by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {ALBUM_COLUMNS} FROM albums WHERE id = $1");

        let album = sqlx::query_as::<_, Album>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(album)
    }

    /// Lists albums a viewer may see, newest first
    ///
    /// Anonymous viewers (`None`) get public albums only; a signed-in viewer
    /// additionally gets their own private albums.
    pub async fn list_visible_to(
        pool: &PgPool,
        viewer: Option<Uuid>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {ALBUM_COLUMNS} FROM albums \
             WHERE visibility = 'public' OR ($1::uuid IS NOT NULL AND author_id = $1) \
             ORDER BY created_at DESC"
        );

        let albums = sqlx::query_as::<_, Album>(&query)
            .bind(viewer)
            .fetch_all(pool)
            .await?;

        Ok(albums)
    }

    /// Lists albums by one author, newest first
    pub async fn list_by_author(
        pool: &PgPool,
        author_id: Uuid,
        include_private: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {ALBUM_COLUMNS} FROM albums \
             WHERE author_id = $1 AND ($2 OR visibility = 'public') \
             ORDER BY created_at DESC"
        );

        let albums = sqlx::query_as::<_, Album>(&query)
            .bind(author_id)
            .bind(include_private)
            .fetch_all(pool)
            .await?;

        Ok(albums)
    }

    /// Updates an existing album
    ///
    /// # Returns
    ///
    /// The updated album if found, None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateAlbum,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut sets: Vec<String> = Vec::new();
        let mut bind_count = 1;

        for (column, present) in [
            ("name", data.name.is_some()),
            ("age", data.age.is_some()),
            ("description", data.description.is_some()),
            ("title", data.title.is_some()),
            ("location", data.location.is_some()),
            ("banner_path", data.banner_path.is_some()),
            ("visibility", data.visibility.is_some()),
        ] {
            if present {
                bind_count += 1;
                sets.push(format!("{} = ${}", column, bind_count));
            }
        }

        if sets.is_empty() {
            return Self::find_by_id(pool, id).await;
        }

        let query = format!(
            "UPDATE albums SET {} WHERE id = $1 RETURNING {ALBUM_COLUMNS}",
            sets.join(", ")
        );

        let mut q = sqlx::query_as::<_, Album>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(age) = data.age {
            q = q.bind(age);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(location) = data.location {
            q = q.bind(location);
        }
        if let Some(banner_path) = data.banner_path {
            q = q.bind(banner_path);
        }
        if let Some(visibility) = data.visibility {
            q = q.bind(visibility.as_str());
        }

        let album = q.fetch_optional(pool).await?;

        Ok(album)
    }

    /// Deletes an album and every image that belongs to it
    ///
    /// Image rows are removed explicitly inside the same transaction as the
    /// album row, so no image is ever left pointing at a missing album. The
    /// foreign key cascade remains as a backstop for deletes issued outside
    /// the application.
    ///
    /// # Returns
    ///
    /// The removed album and images, or None if the album didn't exist
    pub async fn delete_with_images(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<DeletedAlbum>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let images = sqlx::query_as::<_, Image>(
            r#"
            DELETE FROM images
            WHERE album_id = $1
            RETURNING id, album_id, file_path, created_at
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let query = format!("DELETE FROM albums WHERE id = $1 RETURNING {ALBUM_COLUMNS}");
        let album = sqlx::query_as::<_, Album>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        match album {
            Some(album) => {
                tx.commit().await?;
                Ok(Some(DeletedAlbum { album, images }))
            }
            None => {
                tx.rollback().await?;
                Ok(None)
            }
        }
    }
}
