/// Session tokens
///
/// A logged-in browser carries an HS256 JWT in its session cookie. Besides
/// the standard claims, the token holds `auth_hash`, an HMAC fingerprint of
/// the user's password hash at login time. When the password changes the
/// fingerprint no longer matches and the session stops authenticating.
///
/// # Claims
///
/// - `sub`: user ID
/// - `iss`: always "photobook"
/// - `iat` / `nbf` / `exp`: Unix timestamps
/// - `auth_hash`: see [`session_auth_hash`]

use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

/// Issuer claim stamped on every session token
pub const ISSUER: &str = "photobook";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid issuer")]
    InvalidIssuer,
}

/// Session JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    pub iss: String,

    pub iat: i64,

    pub exp: i64,

    pub nbf: i64,

    /// Fingerprint of the password hash the session was opened with
    pub auth_hash: String,
}

impl Claims {
    /// Creates claims for a session that lasts `expires_in`
    pub fn new(user_id: Uuid, auth_hash: String, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            auth_hash,
        }
    }
}

/// Fingerprint of a password hash, keyed with the server secret
///
/// Stored in the session instead of the hash itself so the cookie never
/// carries password material.
pub fn session_auth_hash(password_hash: &str, secret: &str) -> Result<String, JwtError> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|e| JwtError::CreateError(format!("Invalid signing key: {}", e)))?;
    mac.update(b"photobook.session:");
    mac.update(password_hash.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Signs claims into a compact JWT
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates signature, expiry, not-before and issuer, then returns the claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}
