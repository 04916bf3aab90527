//! # Photobook Web Server
//!
//! Serves the Photobook site: accounts with email activation, password
//! reset, profiles and photo albums.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p photobook-api
//! ```

use photobook_api::{
    app::{build_router, AppState},
    config::{Config, MailProvider},
};
use photobook_shared::{
    db::{
        migrations::{get_migration_status, run_migrations},
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    mail::{HttpMailer, LogMailer, Mailer},
    storage::LocalStorage,
    store::PgStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "photobook_api=debug,photobook_shared=debug,tower_http=debug".into()
    });

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn build_mailer(config: &Config) -> anyhow::Result<Arc<dyn Mailer>> {
    let mailer: Arc<dyn Mailer> = match config.mail.provider {
        MailProvider::Log => Arc::new(LogMailer),
        MailProvider::Http => Arc::new(HttpMailer::new(
            config.mail.endpoint.clone(),
            config.mail.api_key.clone().unwrap_or_default(),
            config.mail.sender_email.clone(),
            config.mail.sender_name.clone(),
        )?),
    };
    Ok(mailer)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received, exiting...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!(
        "Photobook server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;
    run_migrations(&pool).await?;

    let schema = get_migration_status(&pool).await?;
    tracing::info!(
        applied_migrations = schema.applied_migrations,
        latest_version = ?schema.latest_version,
        "Database schema ready"
    );

    let mailer = build_mailer(&config)?;
    tracing::info!(mailer = mailer.name(), "Mailer ready");

    let storage = LocalStorage::new(&config.media.root, config.media.max_upload_bytes);
    storage.ensure_dirs().await?;

    let address = config.bind_address();
    let state = AppState::new(config, Arc::new(PgStore::new(pool.clone())), mailer, storage)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    Ok(())
}
