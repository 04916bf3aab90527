/// Route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `home`: Landing page
/// - `accounts`: Registration, activation, login and logout
/// - `password`: Password change and reset
/// - `profile`: Profile pages and avatar
/// - `albums`: Albums, their images and files

pub mod accounts;
pub mod albums;
pub mod health;
pub mod home;
pub mod password;
pub mod profile;

use crate::error::{AppError, AppResult};
use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use photobook_shared::storage::{LocalStorage, StorageError};

/// Streams a stored file back with a content type guessed from its name
pub(crate) async fn serve_media(storage: &LocalStorage, path: &str) -> AppResult<Response> {
    let data = match storage.read(path).await {
        Ok(data) => data,
        Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path, "Stored file is missing");
            return Err(AppError::NotFound);
        }
        Err(e) => return Err(e.into()),
    };

    let mime = mime_guess::from_path(path).first_or_octet_stream();

    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        data,
    )
        .into_response())
}
