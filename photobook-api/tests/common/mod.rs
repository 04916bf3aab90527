//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An application wired to the in-memory store and a recording mailer
//! - A throwaway media directory
//! - User and album fixtures
//! - A cookie-keeping HTTP client driving the router in-process

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use photobook_api::app::{build_router, AppState};
use photobook_api::config::{
    ApiConfig, AuthConfig, Config, DatabaseConfig, MailConfig, MailProvider, MediaConfig,
    SiteConfig,
};
use photobook_api::error::encode_query_value;
use photobook_shared::auth::password::hash_password;
use photobook_shared::mail::RecordingMailer;
use photobook_shared::models::{Album, CreateAlbum, CreateUser, User, Visibility};
use photobook_shared::storage::{LocalStorage, MediaKind};
use photobook_shared::store::{MemoryStore, Store};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Password accepted by every strength rule
pub const PASSWORD: &str = "Sunny-Beach-42";

/// Smallest byte string recognized as a PNG
pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

pub const MAX_UPLOAD_BYTES: usize = 1024;

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub storage: LocalStorage,
    pub app: Router,
    pub config: Config,
    _media: TempDir,
}

pub fn test_config(media_root: &std::path::Path) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            production: false,
        },
        database: DatabaseConfig {
            url: "postgresql://localhost/photobook_test".to_string(),
            max_connections: 1,
        },
        auth: AuthConfig {
            secret: "integration-test-secret-0123456789abcdef".to_string(),
            session_ttl_hours: 24,
            account_token_ttl_hours: 72,
        },
        site: SiteConfig {
            domain: "photos.example.com".to_string(),
            protocol: "https".to_string(),
        },
        mail: MailConfig {
            provider: MailProvider::Log,
            api_key: None,
            sender_email: "noreply@photos.example.com".to_string(),
            sender_name: Some("Photobook".to_string()),
            endpoint: "http://localhost/mail".to_string(),
        },
        media: MediaConfig {
            root: media_root.to_path_buf(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            max_request_bytes: 64 * 1024,
        },
    }
}

impl TestContext {
    /// Creates a new test context with an empty store and media directory
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_mailer(RecordingMailer::new()).await
    }

    pub async fn with_mailer(mailer: RecordingMailer) -> anyhow::Result<Self> {
        Self::build(MemoryStore::new(), mailer).await
    }

    pub async fn with_store(store: MemoryStore) -> anyhow::Result<Self> {
        Self::build(store, RecordingMailer::new()).await
    }

    async fn build(store: MemoryStore, mailer: RecordingMailer) -> anyhow::Result<Self> {
        let media = tempfile::tempdir()?;
        let config = test_config(media.path());

        let store = Arc::new(store);
        let mailer = Arc::new(mailer);
        let storage = LocalStorage::new(media.path(), config.media.max_upload_bytes);
        storage.ensure_dirs().await?;

        let state = AppState::new(config.clone(), store.clone(), mailer.clone(), storage.clone())?;
        let app = build_router(state);

        Ok(TestContext {
            store,
            mailer,
            storage,
            app,
            config,
            _media: media,
        })
    }

    pub fn client(&self) -> TestClient {
        TestClient::new(self.app.clone())
    }

    /// Inserts a user directly, bypassing registration
    pub async fn create_user(&self, username: &str, active: bool) -> anyhow::Result<User> {
        let user = self
            .store
            .create_user(CreateUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: hash_password(PASSWORD)?,
                is_active: active,
            })
            .await?;
        Ok(user)
    }

    /// Inserts an album with a stored banner
    pub async fn create_album(
        &self,
        author: &User,
        name: &str,
        visibility: Visibility,
    ) -> anyhow::Result<Album> {
        let banner = self.storage.store_image(MediaKind::Banner, PNG).await?;
        let album = self
            .store
            .create_album(CreateAlbum {
                name: name.to_string(),
                age: None,
                description: format!("{} description", name),
                title: format!("{} title", name),
                location: "Lisbon".to_string(),
                banner_path: banner.path,
                author_id: author.id,
                visibility,
            })
            .await?;
        Ok(album)
    }

    /// Returns a client already logged in as `username`
    pub async fn logged_in(&self, username: &str) -> TestClient {
        let mut client = self.client();
        let response = client
            .post_form("/login", &[("username", username), ("password", PASSWORD)])
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "login failed: {}", response.body);
        client
    }

    /// Number of files currently under the media root
    pub fn media_file_count(&self) -> usize {
        fn count(dir: &std::path::Path) -> usize {
            std::fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .flatten()
                        .map(|entry| {
                            let path = entry.path();
                            if path.is_dir() {
                                count(&path)
                            } else {
                                1
                            }
                        })
                        .sum()
                })
                .unwrap_or(0)
        }
        count(self._media.path())
    }

    /// Path part of the first link in the last email, starting at `prefix`
    pub async fn last_email_link(&self, prefix: &str) -> Option<String> {
        let message = self.mailer.last().await?;
        link_path(&message.body, prefix)
    }
}

pub fn link_path(body: &str, prefix: &str) -> Option<String> {
    let start = body.find(prefix)?;
    let link = body[start..].split_whitespace().next()?;
    Some(link.to_string())
}

/// A response with the body read into a string
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub content_type: Option<String>,
    pub headers: axum::http::HeaderMap,
    pub bytes: Vec<u8>,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or_default()
    }
}

/// One part of a multipart body
pub enum Part<'a> {
    Field(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

const BOUNDARY: &str = "photobook-test-boundary";

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Field(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Drives the router in-process and keeps cookies between requests
pub struct TestClient {
    app: Router,
    cookies: HashMap<String, String>,
}

impl TestClient {
    pub fn new(app: Router) -> Self {
        Self {
            app,
            cookies: HashMap::new(),
        }
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    pub fn clear_cookies(&mut self) {
        self.cookies.clear();
    }

    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None, Vec::new()).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", encode_query_value(k), encode_query_value(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.send(
            Method::POST,
            uri,
            Some("application/x-www-form-urlencoded".to_string()),
            body.into_bytes(),
        )
        .await
    }

    pub async fn post_multipart(&mut self, uri: &str, parts: &[Part<'_>]) -> TestResponse {
        self.send(
            Method::POST,
            uri,
            Some(format!("multipart/form-data; boundary={}", BOUNDARY)),
            multipart_body(parts),
        )
        .await
    }

    /// Follows a redirect response with a GET
    pub async fn follow(&mut self, response: &TestResponse) -> TestResponse {
        let location = response
            .location
            .clone()
            .unwrap_or_else(|| panic!("Expected a redirect, got {}", response.status));
        self.get(&location).await
    }

    async fn send(
        &mut self,
        method: Method,
        uri: &str,
        content_type: Option<String>,
        body: Vec<u8>,
    ) -> TestResponse {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(header::COOKIE, cookie);
        }
        let request = request.body(Body::from(body)).unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            self.store_cookie(value.to_str().unwrap());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let location = headers
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        let body = String::from_utf8_lossy(&bytes).into_owned();

        TestResponse {
            status,
            location,
            content_type,
            headers,
            bytes,
            body,
        }
    }

    fn store_cookie(&mut self, set_cookie: &str) {
        let mut attributes = set_cookie.split(';').map(str::trim);
        let Some((name, value)) = attributes.next().and_then(|pair| pair.split_once('=')) else {
            return;
        };
        let removed = value.is_empty()
            || attributes.any(|attr| attr.eq_ignore_ascii_case("max-age=0"));
        if removed {
            self.cookies.remove(name);
        } else {
            self.cookies.insert(name.to_string(), value.to_string());
        }
    }
}
