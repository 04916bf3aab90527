/// Signed single-purpose account links
///
/// Activation and password reset links carry a `uidb64` (the user ID, URL-safe
/// base64 without padding) and a token. Nothing is stored server-side: the
/// token is an HMAC-SHA256 over the purpose, the user ID, a fingerprint of
/// the user's mutable state and the issue time.
///
/// ```text
/// token = base36(issued_at) "-" hex(HMAC(secret, purpose | user id | fingerprint | issued_at))
/// ```
///
/// The fingerprint makes links single-use without bookkeeping:
///
/// - activation covers `is_active` and the email, so the link dies once the
///   account is active
/// - password reset covers the password hash and the last login time, so the
///   link dies once the password is changed or the user logs in
///
/// All functions take `now` explicitly so expiry is testable.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::models::User;

type HmacSha256 = Hmac<Sha256>;

/// Error type for account token checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Malformed user id")]
    MalformedUid,

    #[error("Token signature does not match")]
    BadSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Invalid signing key: {0}")]
    Key(String),
}

/// What a link is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Activation,
    PasswordReset,
}

impl TokenPurpose {
    fn tag(&self) -> &'static str {
        match self {
            TokenPurpose::Activation => "photobook.activation",
            TokenPurpose::PasswordReset => "photobook.password-reset",
        }
    }

    fn fingerprint(&self, user: &User) -> String {
        match self {
            TokenPurpose::Activation => format!("{}|{}", user.is_active, user.email),
            TokenPurpose::PasswordReset => format!(
                "{}|{}",
                user.password_hash,
                user.last_login_at
                    .map(|at| at.timestamp().to_string())
                    .unwrap_or_default()
            ),
        }
    }
}

/// Issues and checks account tokens for one secret and lifetime
#[derive(Clone)]
pub struct TokenGenerator {
    secret: String,
    ttl: Duration,
}

impl TokenGenerator {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Builds a token for `user`, issued at `now`
    pub fn make_token(
        &self,
        purpose: TokenPurpose,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let issued_at = now.timestamp().max(0) as u64;
        let mac = self.mac(purpose, user, issued_at)?;
        Ok(format!(
            "{}-{}",
            to_base36(issued_at),
            hex::encode(mac.finalize().into_bytes())
        ))
    }

    /// Checks a token for `user` at time `now`
    ///
    /// The signature is compared in constant time. A token issued in the
    /// future or older than the configured lifetime is rejected as expired.
    pub fn check_token(
        &self,
        purpose: TokenPurpose,
        user: &User,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        let (ts_part, sig_part) = token.split_once('-').ok_or(TokenError::Malformed)?;
        let issued_at = from_base36(ts_part).ok_or(TokenError::Malformed)?;
        let signature = hex::decode(sig_part).map_err(|_| TokenError::Malformed)?;

        self.mac(purpose, user, issued_at)?
            .verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let age = now.timestamp() - issued_at as i64;
        if age < 0 || age > self.ttl.num_seconds() {
            return Err(TokenError::Expired);
        }

        Ok(())
    }

    fn mac(
        &self,
        purpose: TokenPurpose,
        user: &User,
        issued_at: u64,
    ) -> Result<HmacSha256, TokenError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| TokenError::Key(e.to_string()))?;
        mac.update(purpose.tag().as_bytes());
        mac.update(b"|");
        mac.update(user.id.as_bytes());
        mac.update(b"|");
        mac.update(purpose.fingerprint(user).as_bytes());
        mac.update(b"|");
        mac.update(&issued_at.to_be_bytes());
        Ok(mac)
    }
}

/// Encodes a user ID for use in a link
pub fn encode_uid(id: Uuid) -> String {
    URL_SAFE_NO_PAD.encode(id.as_bytes())
}

/// Decodes the `uidb64` part of a link
pub fn decode_uid(uidb64: &str) -> Result<Uuid, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(uidb64)
        .map_err(|_| TokenError::MalformedUid)?;
    Uuid::from_slice(&bytes).map_err(|_| TokenError::MalformedUid)
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

fn from_base36(s: &str) -> Option<u64> {
    // 13 base36 digits already exceed u64
    if s.is_empty() || s.len() > 13 {
        return None;
    }
    u64::from_str_radix(s, 36).ok()
}
