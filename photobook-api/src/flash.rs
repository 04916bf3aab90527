//! One-shot feedback messages
//!
//! Messages are queued in a signed cookie and shown (then cleared) by the
//! next rendered page, so they survive the redirect that usually follows a
//! form submission.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "photobook_flash";

/// Severity, also used as the CSS class suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub text: String,
}

impl FlashMessage {
    pub fn new(level: Level, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(Level::Success, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Level::Info, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Level::Error, text)
    }
}

/// Turns a list of problems into error messages
pub fn errors<I, S>(problems: I) -> Vec<FlashMessage>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    problems.into_iter().map(FlashMessage::error).collect()
}

fn encode(messages: &[FlashMessage]) -> Option<String> {
    serde_json::to_vec(messages)
        .ok()
        .map(|json| URL_SAFE_NO_PAD.encode(json))
}

fn decode(value: &str) -> Vec<FlashMessage> {
    URL_SAFE_NO_PAD
        .decode(value)
        .ok()
        .and_then(|json| serde_json::from_slice(&json).ok())
        .unwrap_or_default()
}

fn cookie(value: String) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn pending(jar: &SignedCookieJar) -> Vec<FlashMessage> {
    jar.get(FLASH_COOKIE)
        .map(|c| decode(c.value()))
        .unwrap_or_default()
}

/// Queues messages for the next page
pub fn push_all<I>(jar: SignedCookieJar, messages: I) -> SignedCookieJar
where
    I: IntoIterator<Item = FlashMessage>,
{
    let mut queued = pending(&jar);
    queued.extend(messages);

    match encode(&queued) {
        Some(value) => jar.add(cookie(value)),
        None => jar,
    }
}

pub fn push(jar: SignedCookieJar, message: FlashMessage) -> SignedCookieJar {
    push_all(jar, [message])
}

/// Removes and returns all queued messages
pub fn take(jar: SignedCookieJar) -> (SignedCookieJar, Vec<FlashMessage>) {
    if jar.get(FLASH_COOKIE).is_none() {
        return (jar, Vec::new());
    }

    let messages = pending(&jar);
    let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
    (jar, messages)
}

/// Queues one message and redirects (303) to `to`
pub fn redirect(jar: SignedCookieJar, message: FlashMessage, to: &str) -> Response {
    (push(jar, message), Redirect::to(to)).into_response()
}
