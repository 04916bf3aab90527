/// Configuration management for the web server
///
/// Configuration is loaded from environment variables (and a `.env` file in
/// development) into typed sections.
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default: 0.0.0.0:8080)
/// - `PRODUCTION`: `true` enables HSTS and `Secure` cookies (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `SECRET_KEY`: signing secret for cookies and tokens, at least 32 chars (required)
/// - `SESSION_TTL_HOURS`: session lifetime (default: 336, two weeks)
/// - `ACCOUNT_TOKEN_TTL_HOURS`: activation and reset link lifetime (default: 72)
/// - `SITE_DOMAIN` / `SITE_PROTOCOL`: used to build links in emails
///   (default: localhost:8080 / http)
/// - `MAIL_PROVIDER`: `log` or `http` (default: log)
/// - `MAIL_API_KEY`, `MAIL_SENDER_EMAIL`, `MAIL_SENDER_NAME`, `MAIL_ENDPOINT`:
///   HTTP mail provider settings
/// - `MEDIA_ROOT`: upload directory (default: ./media)
/// - `MEDIA_MAX_UPLOAD_BYTES`: per-file limit (default: 10 MB)
/// - `MEDIA_MAX_REQUEST_BYTES`: whole request limit (default: 50 MB)
/// - `RUST_LOG` / `LOG_FORMAT`: log filter and `json` output
///
/// # Example
///
/// ```no_run
/// use photobook_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Minimum accepted length of `SECRET_KEY`
pub const MIN_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub site: SiteConfig,
    pub mail: MailConfig,
    pub media: MediaConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Running behind HTTPS in production
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Secrets and lifetimes for sessions and account links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Signing secret
    ///
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,

    pub session_ttl_hours: i64,

    pub account_token_ttl_hours: i64,
}

/// Public address of the site, for absolute links in emails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub domain: String,
    pub protocol: String,
}

/// Which mailer to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailProvider {
    /// Log messages instead of sending them
    Log,

    /// Brevo-compatible HTTP API
    Http,
}

impl FromStr for MailProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "log" => Ok(MailProvider::Log),
            "http" | "brevo" => Ok(MailProvider::Http),
            other => anyhow::bail!("Unknown MAIL_PROVIDER: {}", other),
        }
    }
}

/// Outbound mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub provider: MailProvider,

    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub sender_email: String,

    pub sender_name: Option<String>,

    pub endpoint: String,
}

/// Upload storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub root: PathBuf,

    /// Largest accepted single file
    pub max_upload_bytes: usize,

    /// Largest accepted request body
    pub max_request_bytes: usize,
}

fn parse_var<T>(name: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", name, e))
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value cannot
    /// be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let secret = env::var("SECRET_KEY")
            .map_err(|_| anyhow::anyhow!("SECRET_KEY environment variable is required"))?;

        let provider: MailProvider = parse_var("MAIL_PROVIDER", "log")?;
        let api_key = optional_var("MAIL_API_KEY");
        if provider == MailProvider::Http && api_key.is_none() {
            anyhow::bail!("MAIL_API_KEY is required when MAIL_PROVIDER=http");
        }

        let config = Self {
            api: ApiConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("API_PORT", "8080")?,
                production: parse_var("PRODUCTION", "false")?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "10")?,
            },
            auth: AuthConfig {
                secret,
                session_ttl_hours: parse_var("SESSION_TTL_HOURS", "336")?,
                account_token_ttl_hours: parse_var("ACCOUNT_TOKEN_TTL_HOURS", "72")?,
            },
            site: SiteConfig {
                domain: env::var("SITE_DOMAIN").unwrap_or_else(|_| "localhost:8080".to_string()),
                protocol: env::var("SITE_PROTOCOL").unwrap_or_else(|_| "http".to_string()),
            },
            mail: MailConfig {
                provider,
                api_key,
                sender_email: env::var("MAIL_SENDER_EMAIL")
                    .unwrap_or_else(|_| "noreply@localhost".to_string()),
                sender_name: optional_var("MAIL_SENDER_NAME"),
                endpoint: env::var("MAIL_ENDPOINT").unwrap_or_else(|_| {
                    photobook_shared::mail::brevo::DEFAULT_ENDPOINT.to_string()
                }),
            },
            media: MediaConfig {
                root: PathBuf::from(env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string())),
                max_upload_bytes: parse_var("MEDIA_MAX_UPLOAD_BYTES", "10485760")?,
                max_request_bytes: parse_var("MEDIA_MAX_REQUEST_BYTES", "52428800")?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth.secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!(
                "SECRET_KEY must be at least {} characters long",
                MIN_SECRET_LENGTH
            );
        }
        if self.auth.session_ttl_hours <= 0 || self.auth.account_token_ttl_hours <= 0 {
            anyhow::bail!("Session and account token lifetimes must be positive");
        }
        if self.media.max_request_bytes < self.media.max_upload_bytes {
            anyhow::bail!("MEDIA_MAX_REQUEST_BYTES must not be smaller than MEDIA_MAX_UPLOAD_BYTES");
        }
        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Absolute URL of a site path, e.g. `http://localhost:8080/login`
    pub fn site_url(&self, path: &str) -> String {
        format!("{}://{}{}", self.site.protocol, self.site.domain, path)
    }
}
