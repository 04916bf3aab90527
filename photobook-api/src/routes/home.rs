/// Landing page: latest public albums, plus the viewer's own

use crate::{app::AppState, error::AppResult, session::Viewer, templates::render_page};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde_json::json;

pub async fn home(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
) -> AppResult<Response> {
    let public_albums = state.store.list_albums_visible_to(None).await?;
    let own_albums = match viewer.id() {
        Some(id) => state.store.list_albums_by_author(id, true).await?,
        None => Vec::new(),
    };

    let page = render_page(
        &state.templates,
        jar,
        &viewer,
        Vec::new(),
        "home.html",
        json!({
            "public_albums": public_albums,
            "own_albums": own_albums,
        }),
    )?;

    Ok(page.into_response())
}
