/// Error handling for the web server
///
/// Handlers return `AppResult<Response>`. Expected outcomes such as form
/// validation failures are rendered by the handlers themselves; `AppError`
/// covers everything that ends the request early:
///
/// - `Unauthenticated` redirects to the login page
/// - `AlreadyAuthenticated` redirects to the home page
/// - `Forbidden`, `NotFound` and `BadRequest` render a short error page
/// - `Internal` is logged and rendered as a generic 500 page

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use photobook_shared::{
    auth::{jwt::JwtError, password::PasswordError},
    storage::StorageError,
    store::StoreError,
};
use std::fmt;

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

/// Unified handler error type
#[derive(Debug)]
pub enum AppError {
    /// Login required; `next` is the path to return to
    Unauthenticated { next: String },

    /// Page is for anonymous visitors only
    AlreadyAuthenticated,

    /// Bad request (400)
    BadRequest(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound,

    /// Internal server error (500)
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Unauthenticated { next } => write!(f, "Authentication required for {}", next),
            AppError::AlreadyAuthenticated => write!(f, "Already authenticated"),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound => write!(f, "Not found"),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Bytes escaped in a query value; unreserved characters and `/` pass through
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Percent-encodes a value for use in a query string
pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

fn error_page(status: StatusCode, title: &str, message: &str) -> Response {
    let body = format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{title} | Photobook</title></head>\n\
         <body>\n<main>\n<h1>{title}</h1>\n<p>{message}</p>\n<p><a href=\"/\">Back to the home page</a></p>\n</main>\n</body>\n</html>\n"
    );
    (status, Html(body)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthenticated { next } => {
                Redirect::to(&format!("/login?next={}", encode_query_value(&next))).into_response()
            }
            AppError::AlreadyAuthenticated => Redirect::to("/").into_response(),
            AppError::BadRequest(msg) => {
                tracing::debug!(reason = %msg, "Bad request");
                error_page(
                    StatusCode::BAD_REQUEST,
                    "Bad request",
                    "The request could not be understood.",
                )
            }
            AppError::Forbidden(msg) => {
                tracing::debug!(reason = %msg, "Forbidden");
                error_page(
                    StatusCode::FORBIDDEN,
                    "Forbidden",
                    "You do not have permission to do that.",
                )
            }
            AppError::NotFound => error_page(
                StatusCode::NOT_FOUND,
                "Page not found",
                "The page you requested does not exist.",
            ),
            AppError::Internal(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!(error = %msg, "Internal error");
                error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error",
                    "Something went wrong on our side. Please try again later.",
                )
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::NotFound,
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        AppError::Internal(format!("Session token error: {}", err))
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        if err.is_user_error() {
            AppError::BadRequest(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadRequest(format!("Invalid multipart body: {}", err))
    }
}

impl From<minijinja::Error> for AppError {
    fn from(err: minijinja::Error) -> Self {
        AppError::Internal(format!("Template error: {:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[test]
    fn test_error_display() {
        assert_eq!(AppError::NotFound.to_string(), "Not found");
        assert_eq!(
            AppError::Forbidden("nope".to_string()).to_string(),
            "Forbidden: nope"
        );
    }

    #[test]
    fn test_unauthenticated_redirects_to_login() {
        let response = AppError::Unauthenticated {
            next: "/albums/new".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/login?next=/albums/new"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Forbidden(String::new()).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Internal("db down".to_string()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::AlreadyAuthenticated.into_response().status(),
            StatusCode::SEE_OTHER
        );
    }

    #[test]
    fn test_storage_mapping() {
        assert!(matches!(
            AppError::from(StorageError::UnsupportedFormat),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(StorageError::InvalidPath("..".to_string())),
            AppError::Internal(_)
        ));
    }

    #[test]
    fn test_encode_query_value() {
        assert_eq!(encode_query_value("/profile/a+b@x"), "/profile/a%2Bb%40x");
        assert_eq!(encode_query_value("/a?b=c&d"), "/a%3Fb%3Dc%26d");
        assert_eq!(encode_query_value("/profile/j\u{f6}rg x"), "/profile/j%C3%B6rg%20x");
    }
}
