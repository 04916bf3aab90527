/// Image model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE images (
///     id UUID PRIMARY KEY,
///     album_id UUID REFERENCES albums(id) ON DELETE CASCADE,
///     file_path VARCHAR(512) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A stored picture, usually inside an album
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Image {
    pub id: Uuid,

    /// Owning album
    pub album_id: Option<Uuid>,

    /// Stored file, relative to the media root
    pub file_path: String,

    pub created_at: DateTime<Utc>,
}

impl Image {
    /// Adds an image to an album
    pub async fn create(
        pool: &PgPool,
        album_id: Uuid,
        file_path: String,
    ) -> Result<Self, sqlx::Error> {
        let image = sqlx::query_as::<_, Image>(
            r#"
            INSERT INTO images (id, album_id, file_path)
            VALUES ($1, $2, $3)
            RETURNING id, album_id, file_path, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(album_id)
        .bind(file_path)
        .fetch_one(pool)
        .await?;

        Ok(image)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let image = sqlx::query_as::<_, Image>(
            "SELECT id, album_id, file_path, created_at FROM images WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(image)
    }

    /// Lists an album's images in upload order
    pub async fn list_by_album(pool: &PgPool, album_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let images = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, album_id, file_path, created_at
            FROM images
            WHERE album_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(album_id)
        .fetch_all(pool)
        .await?;

        Ok(images)
    }

    /// Counts images referencing an album
    pub async fn count_by_album(pool: &PgPool, album_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM images WHERE album_id = $1")
            .bind(album_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Deletes a single image row
    ///
    /// # Returns
    ///
    /// The removed image (so the caller can delete its file), or None
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let image = sqlx::query_as::<_, Image>(
            r#"
            DELETE FROM images
            WHERE id = $1
            RETURNING id, album_id, file_path, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(image)
    }
}
