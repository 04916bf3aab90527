/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use photobook_api::{app::AppState, config::Config};
/// use photobook_shared::{mail::LogMailer, storage::LocalStorage, store::MemoryStore};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let storage = LocalStorage::new(&config.media.root, config.media.max_upload_bytes);
/// let state = AppState::new(
///     config,
///     Arc::new(MemoryStore::new()),
///     Arc::new(LogMailer),
///     storage,
/// )?;
/// let app = photobook_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, templates::Templates};
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::Key;
use photobook_shared::{
    auth::account_token::TokenGenerator, mail::Mailer, storage::LocalStorage, store::Store,
};
use sha2::{Digest, Sha512};
use std::sync::Arc;
use tower_http::{
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend
    pub store: Arc<dyn Store>,

    /// Outbound email
    pub mailer: Arc<dyn Mailer>,

    /// Uploaded files
    pub storage: LocalStorage,

    pub templates: Templates,

    /// Application configuration
    pub config: Arc<Config>,

    /// Key for the signed cookie jar
    pub cookie_key: Key,

    /// Activation and password reset links
    pub tokens: TokenGenerator,
}

impl AppState {
    /// Creates new application state
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded templates fail to load.
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        storage: LocalStorage,
    ) -> anyhow::Result<Self> {
        let templates = Templates::new()?;
        let cookie_key = Key::from(Sha512::digest(config.auth.secret.as_bytes()).as_slice());
        let tokens = TokenGenerator::new(
            config.auth.secret.clone(),
            chrono::Duration::hours(config.auth.account_token_ttl_hours),
        );

        Ok(Self {
            store,
            mailer,
            storage,
            templates,
            config: Arc::new(config),
            cookie_key,
            tokens,
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health
/// ├── GET  /                                   # Home page
/// ├── GET|POST /register
/// ├── GET  /activate/:uidb64/:token
/// ├── GET|POST /login
/// ├── GET|POST /logout
/// ├── GET|POST /password-change
/// ├── GET|POST /password-reset
/// ├── GET|POST /password-reset-confirm/:uidb64/:token
/// ├── /profile/:username
/// │   ├── GET|POST /
/// │   └── GET  /avatar
/// ├── GET|POST /albums
/// └── /albums
///     ├── GET  /new
///     ├── GET  /:id
///     ├── GET|POST /:id/edit
///     ├── POST /:id/delete
///     ├── GET  /:id/banner
///     ├── POST /:id/images
///     ├── GET  /:id/images/:image_id
///     └── POST /:id/images/:image_id/delete
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Request body limit (tower-http RequestBodyLimitLayer)
/// 2. Logging (tower-http TraceLayer)
/// 3. Security headers
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let account_routes = Router::new()
        .route(
            "/register",
            get(routes::accounts::register_form).post(routes::accounts::register),
        )
        .route("/activate/:uidb64/:token", get(routes::accounts::activate))
        .route(
            "/login",
            get(routes::accounts::login_form).post(routes::accounts::login),
        )
        .route(
            "/logout",
            get(routes::accounts::logout).post(routes::accounts::logout),
        )
        .route(
            "/password-change",
            get(routes::password::change_form).post(routes::password::change),
        )
        .route(
            "/password-reset",
            get(routes::password::reset_form).post(routes::password::reset_request),
        )
        .route(
            "/password-reset-confirm/:uidb64/:token",
            get(routes::password::reset_confirm_form).post(routes::password::reset_confirm),
        );

    let profile_routes = Router::new()
        .route(
            "/:username",
            get(routes::profile::show).post(routes::profile::update),
        )
        .route("/:username/avatar", get(routes::profile::avatar));

    let album_routes = Router::new()
        .route("/new", get(routes::albums::new_form))
        .route("/:id", get(routes::albums::show))
        .route(
            "/:id/edit",
            get(routes::albums::edit_form).post(routes::albums::update),
        )
        .route("/:id/delete", post(routes::albums::delete))
        .route("/:id/banner", get(routes::albums::banner))
        .route("/:id/images", post(routes::albums::add_images))
        .route("/:id/images/:image_id", get(routes::albums::image))
        .route(
            "/:id/images/:image_id/delete",
            post(routes::albums::delete_image),
        );

    let max_request_bytes = state.config.media.max_request_bytes;
    let production = state.config.api.production;

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/", get(routes::home::home))
        .merge(account_routes)
        .nest("/profile", profile_routes)
        .nest("/albums", album_routes)
        .route("/albums", get(routes::albums::index).post(routes::albums::create))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_request_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}
