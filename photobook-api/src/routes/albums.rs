/// Albums and their images
///
/// # Endpoints
///
/// - `GET /albums` - Albums visible to the viewer
/// - `GET /albums/new`, `POST /albums` - Create (signed-in only)
/// - `GET /albums/:id` - Album page
/// - `GET|POST /albums/:id/edit` - Edit (author only)
/// - `POST /albums/:id/delete` - Delete with all images and files (author only)
/// - `POST /albums/:id/images` - Add images (author only)
/// - `POST /albums/:id/images/:image_id/delete` - Remove one image (author only)
/// - `GET /albums/:id/banner`, `GET /albums/:id/images/:image_id` - Files
///
/// Every handler loads the album first and runs [`Viewer::authorize_album`]
/// before touching it. A private album answers 404 to anyone but its author.

use crate::{
    app::AppState,
    error::{AppError, AppResult},
    flash::{self, FlashMessage},
    forms::{visibility_options, AlbumForm},
    multipart::{MultipartForm, UploadedFile},
    routes::serve_media,
    session::Viewer,
    templates::render_page,
};
use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::SignedCookieJar;
use photobook_shared::{
    auth::authorization::ResourcePermission,
    models::{Album, CreateAlbum, Image, UpdateAlbum},
    storage::{validate_image, LocalStorage, MediaKind, StorageError, StoredFile},
};
use serde_json::json;
use uuid::Uuid;

/// Loads an album and applies the access policy
async fn load_album(
    state: &AppState,
    viewer: &Viewer,
    id: Uuid,
    permission: ResourcePermission,
) -> AppResult<Album> {
    let album = state.store.find_album(id).await?.ok_or(AppError::NotFound)?;
    viewer.authorize_album(&album, permission)?;
    Ok(album)
}

/// Loads an image that belongs to `album`
async fn load_image(state: &AppState, album: &Album, image_id: Uuid) -> AppResult<Image> {
    match state.store.find_image(image_id).await? {
        Some(image) if image.album_id == Some(album.id) => Ok(image),
        _ => Err(AppError::NotFound),
    }
}

fn paths_of(files: &[StoredFile]) -> Vec<String> {
    files.iter().map(|f| f.path.clone()).collect()
}

fn image_problems(label: &str, files: &[UploadedFile], max_bytes: usize) -> Vec<String> {
    files
        .iter()
        .filter_map(|file| {
            validate_image(&file.data, max_bytes).err().map(|e| match &file.file_name {
                Some(name) => format!("{} ({}): {}", label, name, e),
                None => format!("{}: {}", label, e),
            })
        })
        .collect()
}

/// Stores every file, removing the ones already written if one fails
async fn store_files(
    storage: &LocalStorage,
    kind: MediaKind,
    files: &[UploadedFile],
) -> Result<Vec<StoredFile>, StorageError> {
    let mut stored = Vec::with_capacity(files.len());

    for file in files {
        match storage.store_image(kind, &file.data).await {
            Ok(saved) => stored.push(saved),
            Err(e) => {
                storage.delete_all(&paths_of(&stored)).await;
                return Err(e);
            }
        }
    }

    Ok(stored)
}

/// Writes an image row for each stored file
///
/// On failure the files that did not get a row are removed before the error
/// is returned. Rows written before the failure stay in place.
async fn attach_images(state: &AppState, album_id: Uuid, files: &[StoredFile]) -> AppResult<()> {
    for (attached, file) in files.iter().enumerate() {
        if let Err(e) = state.store.add_image(album_id, file.path.clone()).await {
            let orphaned = paths_of(&files[attached..]);
            state.storage.delete_all(&orphaned).await;
            return Err(e.into());
        }
    }
    Ok(())
}

fn render_form(
    state: &AppState,
    jar: SignedCookieJar,
    viewer: &Viewer,
    form: &AlbumForm,
    editing: Option<&Album>,
    problems: Vec<String>,
) -> AppResult<Response> {
    let (heading, action) = match editing {
        Some(album) => (
            format!("Edit {}", album.name),
            format!("/albums/{}/edit", album.id),
        ),
        None => ("Create a new album".to_string(), "/albums".to_string()),
    };

    let page = render_page(
        &state.templates,
        jar,
        viewer,
        flash::errors(problems),
        "albums/form.html",
        json!({
            "form": form,
            "heading": heading,
            "action": action,
            "editing": editing.is_some(),
            "visibilities": visibility_options(),
        }),
    )?;
    Ok(page.into_response())
}

pub async fn index(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
) -> AppResult<Response> {
    let albums = state.store.list_albums_visible_to(viewer.id()).await?;

    let page = render_page(
        &state.templates,
        jar,
        &viewer,
        Vec::new(),
        "albums/list.html",
        json!({ "albums": albums }),
    )?;
    Ok(page.into_response())
}

pub async fn new_form(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
) -> AppResult<Response> {
    viewer.require_login()?;
    render_form(&state, jar, &viewer, &AlbumForm::default(), None, Vec::new())
}

/// Creates an album with its banner and any number of images
pub async fn create(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
    multipart: Multipart,
) -> AppResult<Response> {
    let user = viewer.require_login()?;

    let upload = MultipartForm::read(multipart).await?;
    let form = AlbumForm::from_fields(&upload.fields);
    let max_bytes = state.storage.max_bytes();

    let mut problems = form.problems();
    match upload.file("banner") {
        Some(banner) => problems.extend(image_problems("Banner", std::slice::from_ref(banner), max_bytes)),
        None => problems.push("A banner image is required.".to_string()),
    }
    problems.extend(image_problems("Image", upload.files("images"), max_bytes));

    let (Some(banner), Some(visibility), true) =
        (upload.file("banner"), form.visibility(), problems.is_empty())
    else {
        return render_form(&state, jar, &viewer, &form, None, problems);
    };

    let banner = state.storage.store_image(MediaKind::Banner, &banner.data).await?;
    let images = match store_files(&state.storage, MediaKind::AlbumImage, upload.files("images")).await {
        Ok(images) => images,
        Err(e) => {
            state.storage.delete_all(&[banner.path.clone()]).await;
            return Err(e.into());
        }
    };

    let created = state
        .store
        .create_album(CreateAlbum {
            name: form.name.clone(),
            age: form.age(),
            description: form.description.clone(),
            title: form.title.clone(),
            location: form.location.clone(),
            banner_path: banner.path.clone(),
            author_id: user.id,
            visibility,
        })
        .await;

    let album = match created {
        Ok(album) => album,
        Err(e) => {
            let mut paths = paths_of(&images);
            paths.push(banner.path.clone());
            state.storage.delete_all(&paths).await;
            return Err(e.into());
        }
    };

    if let Err(e) = attach_images(&state, album.id, &images).await {
        // Drop the half-built album along with every file written for it
        if let Err(cleanup) = state.store.delete_album(album.id).await {
            tracing::warn!(album_id = %album.id, error = %cleanup, "Failed to remove partial album");
        }
        let mut paths = paths_of(&images);
        paths.push(banner.path.clone());
        state.storage.delete_all(&paths).await;
        return Err(e);
    }

    tracing::info!(
        album_id = %album.id,
        user_id = %user.id,
        images = images.len(),
        "Album created"
    );

    Ok(flash::redirect(
        jar,
        FlashMessage::success(format!("Album {} was created", album.name)),
        &format!("/albums/{}", album.id),
    ))
}

pub async fn show(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let album = load_album(&state, &viewer, id, ResourcePermission::Read).await?;
    let images = state.store.list_images(album.id).await?;
    let author = match album.author_id {
        Some(author_id) => state.store.find_user_by_id(author_id).await?,
        None => None,
    };
    let is_owner = viewer.id().is_some_and(|viewer_id| album.is_owned_by(viewer_id));

    let page = render_page(
        &state.templates,
        jar,
        &viewer,
        Vec::new(),
        "albums/detail.html",
        json!({
            "album": album,
            "images": images,
            "author": author,
            "is_owner": is_owner,
        }),
    )?;
    Ok(page.into_response())
}

pub async fn edit_form(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let album = load_album(&state, &viewer, id, ResourcePermission::Write).await?;
    render_form(
        &state,
        jar,
        &viewer,
        &AlbumForm::from_album(&album),
        Some(&album),
        Vec::new(),
    )
}

/// Updates album fields; a new banner replaces the old file
pub async fn update(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Response> {
    let album = load_album(&state, &viewer, id, ResourcePermission::Write).await?;

    let upload = MultipartForm::read(multipart).await?;
    let form = AlbumForm::from_fields(&upload.fields);
    let banner = upload.file("banner");

    let mut problems = form.problems();
    if let Some(banner) = banner {
        problems.extend(image_problems(
            "Banner",
            std::slice::from_ref(banner),
            state.storage.max_bytes(),
        ));
    }

    let (Some(visibility), true) = (form.visibility(), problems.is_empty()) else {
        return render_form(&state, jar, &viewer, &form, Some(&album), problems);
    };

    let new_banner = match banner {
        Some(file) => Some(state.storage.store_image(MediaKind::Banner, &file.data).await?),
        None => None,
    };

    let updated = state
        .store
        .update_album(
            album.id,
            UpdateAlbum {
                name: Some(form.name.clone()),
                age: Some(form.age()),
                description: Some(form.description.clone()),
                title: Some(form.title.clone()),
                location: Some(form.location.clone()),
                banner_path: new_banner.as_ref().map(|f| f.path.clone()),
                visibility: Some(visibility),
            },
        )
        .await;

    let updated = match updated {
        Ok(Some(updated)) => updated,
        other => {
            if let Some(file) = &new_banner {
                state.storage.delete_all(&[file.path.clone()]).await;
            }
            return match other {
                Err(e) => Err(e.into()),
                _ => Err(AppError::NotFound),
            };
        }
    };

    if new_banner.is_some() {
        state.storage.delete_all(&[album.banner_path.clone()]).await;
    }

    tracing::info!(album_id = %updated.id, "Album updated");

    Ok(flash::redirect(
        jar,
        FlashMessage::success(format!("Album {} was updated", updated.name)),
        &format!("/albums/{}", updated.id),
    ))
}

/// Deletes the album, its image rows and every stored file
pub async fn delete(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let album = load_album(&state, &viewer, id, ResourcePermission::Write).await?;

    let deleted = state
        .store
        .delete_album(album.id)
        .await?
        .ok_or(AppError::NotFound)?;

    let failed = state.storage.delete_all(&deleted.file_paths()).await;
    if failed > 0 {
        tracing::warn!(album_id = %album.id, failed, "Some album files could not be removed");
    }

    tracing::info!(
        album_id = %album.id,
        images = deleted.images.len(),
        "Album deleted"
    );

    Ok(flash::redirect(
        jar,
        FlashMessage::success(format!("Album {} was deleted", deleted.album.name)),
        "/albums",
    ))
}

pub async fn add_images(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Response> {
    let album = load_album(&state, &viewer, id, ResourcePermission::Write).await?;
    let back = format!("/albums/{}", album.id);

    let upload = MultipartForm::read(multipart).await?;
    let files = upload.files("images");

    if files.is_empty() {
        return Ok(flash::redirect(
            jar,
            FlashMessage::error("Choose at least one image to upload."),
            &back,
        ));
    }

    let problems = image_problems("Image", files, state.storage.max_bytes());
    if !problems.is_empty() {
        let jar = flash::push_all(jar, flash::errors(problems));
        return Ok((jar, axum::response::Redirect::to(&back)).into_response());
    }

    let stored = store_files(&state.storage, MediaKind::AlbumImage, files).await?;
    attach_images(&state, album.id, &stored).await?;

    tracing::info!(album_id = %album.id, images = stored.len(), "Images added");

    let noun = if stored.len() == 1 { "image" } else { "images" };
    Ok(flash::redirect(
        jar,
        FlashMessage::success(format!("{} {} added to {}", stored.len(), noun, album.name)),
        &back,
    ))
}

pub async fn delete_image(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Response> {
    let album = load_album(&state, &viewer, id, ResourcePermission::Write).await?;
    let image = load_image(&state, &album, image_id).await?;

    if let Some(removed) = state.store.delete_image(image.id).await? {
        state.storage.delete_all(&[removed.file_path.clone()]).await;
    }

    tracing::info!(album_id = %album.id, image_id = %image.id, "Image removed");

    Ok(flash::redirect(
        jar,
        FlashMessage::success("Image removed"),
        &format!("/albums/{}", album.id),
    ))
}

pub async fn banner(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let album = load_album(&state, &viewer, id, ResourcePermission::Read).await?;
    serve_media(&state.storage, &album.banner_path).await
}

pub async fn image(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Response> {
    let album = load_album(&state, &viewer, id, ResourcePermission::Read).await?;
    let image = load_image(&state, &album, image_id).await?;
    serve_media(&state.storage, &image.file_path).await
}
