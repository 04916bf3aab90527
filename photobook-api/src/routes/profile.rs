/// Profile pages
///
/// # Endpoints
///
/// - `GET /profile/:username` - Own profile as an edit form, anyone else's read-only
/// - `POST /profile/:username` - Update own profile (multipart, optional `avatar`)
/// - `GET /profile/:username/avatar` - Avatar file
///
/// All three need a signed-in user.

use crate::{
    app::AppState,
    error::{AppError, AppResult},
    flash::{self, FlashMessage},
    forms::{self, ProfileForm},
    multipart::MultipartForm,
    routes::serve_media,
    session::{GuardError, Viewer},
    templates::render_page,
};
use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::SignedCookieJar;
use photobook_shared::{
    auth::authorization::require_profile_owner,
    models::{UpdateUser, User},
    storage::{validate_image, MediaKind},
    store::{StoreError, UniqueField},
};
use serde_json::json;

fn unknown_user(jar: SignedCookieJar, username: &str) -> Response {
    flash::redirect(
        jar,
        FlashMessage::error(format!("User {} does not exist", username)),
        "/",
    )
}

async fn render_edit(
    state: &AppState,
    jar: SignedCookieJar,
    viewer: &Viewer,
    form: &ProfileForm,
    problems: Vec<String>,
) -> AppResult<Response> {
    let albums = match viewer.id() {
        Some(id) => state.store.list_albums_by_author(id, true).await?,
        None => Vec::new(),
    };

    let page = render_page(
        &state.templates,
        jar,
        viewer,
        flash::errors(problems),
        "profile/edit.html",
        json!({ "form": form, "albums": albums }),
    )?;
    Ok(page.into_response())
}

pub async fn show(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let me = viewer.require_login()?;

    let Some(profile) = state.store.find_user_by_username(&username).await? else {
        return Ok(unknown_user(jar, &username));
    };

    if profile.id == me.id {
        let form = ProfileForm::from_user(me);
        return render_edit(&state, jar, &viewer, &form, Vec::new()).await;
    }

    let albums = state.store.list_albums_by_author(profile.id, false).await?;
    let page = render_page(
        &state.templates,
        jar,
        &viewer,
        Vec::new(),
        "profile/view.html",
        json!({ "profile": profile, "albums": albums }),
    )?;
    Ok(page.into_response())
}

/// Updates the signed-in user's own profile
///
/// Nothing is written unless the whole submission is valid.
pub async fn update(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
    Path(username): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let me = viewer.require_login()?;

    let Some(profile) = state.store.find_user_by_username(&username).await? else {
        return Ok(unknown_user(jar, &username));
    };
    require_profile_owner(me.id, profile.id).map_err(|_| GuardError::Forbidden)?;

    let upload = MultipartForm::read(multipart).await?;
    let form = ProfileForm::from_fields(&upload.fields);

    let mut problems = form.problems();
    problems.extend(
        forms::uniqueness_problems(state.store.as_ref(), &form.username, &form.email, Some(me.id))
            .await?,
    );

    let avatar = upload.file("avatar");
    if let Some(file) = avatar {
        if let Err(e) = validate_image(&file.data, state.storage.max_bytes()) {
            problems.push(format!("Avatar: {}", e));
        }
    }

    if !problems.is_empty() {
        return render_edit(&state, jar, &viewer, &form, problems).await;
    }

    let new_avatar = match avatar {
        Some(file) => Some(state.storage.store_image(MediaKind::Avatar, &file.data).await?),
        None => None,
    };

    let updated = state
        .store
        .update_user(
            me.id,
            UpdateUser {
                username: Some(form.username.clone()),
                email: Some(form.email.clone()),
                first_name: Some(form.first_name.clone()),
                last_name: Some(form.last_name.clone()),
                bio: Some(form.bio.clone()),
                avatar_path: new_avatar.as_ref().map(|f| Some(f.path.clone())),
                ..Default::default()
            },
        )
        .await;

    let updated: User = match updated {
        Ok(Some(user)) => user,
        Ok(None) => return Err(AppError::NotFound),
        Err(StoreError::Conflict(field)) => {
            if let Some(file) = &new_avatar {
                state.storage.delete_all(&[file.path.clone()]).await;
            }
            let problem = match field {
                UniqueField::Username => forms::USERNAME_TAKEN,
                UniqueField::Email => forms::EMAIL_TAKEN,
            };
            return render_edit(&state, jar, &viewer, &form, vec![problem.to_string()]).await;
        }
        Err(e) => return Err(e.into()),
    };

    if new_avatar.is_some() {
        if let Some(old) = &me.avatar_path {
            state.storage.delete_all(&[old.clone()]).await;
        }
    }

    tracing::info!(user_id = %updated.id, "Profile updated");

    Ok(flash::redirect(
        jar,
        FlashMessage::success(format!(
            "{}, your profile was updated successfully",
            updated.username
        )),
        &format!("/profile/{}", updated.username),
    ))
}

pub async fn avatar(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
) -> AppResult<Response> {
    viewer.require_login()?;

    let path = state
        .store
        .find_user_by_username(&username)
        .await?
        .and_then(|user| user.avatar_path)
        .ok_or(AppError::NotFound)?;

    serve_media(&state.storage, &path).await
}
