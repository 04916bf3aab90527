/// Session cookie and request guards
///
/// A logged-in browser carries a session JWT in the signed cookie jar. The
/// [`Viewer`] extractor resolves it to the current user on every request and
/// exposes the guard calls handlers make before doing any work:
///
/// - [`Viewer::require_login`]: the page needs a signed-in user
/// - [`Viewer::require_anonymous`]: the page is for anonymous visitors only
/// - [`Viewer::authorize_album`]: album access policy
///
/// A session is ignored (the viewer is anonymous) when the token does not
/// validate, the user no longer exists or is inactive, or the password has
/// changed since the session was opened.

use crate::{app::AppState, error::AppError};
use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use photobook_shared::{
    auth::{
        authorization::{self, AuthzError, ResourcePermission},
        jwt::{self, Claims, JwtError},
    },
    models::{Album, User},
};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "photobook_session";

/// Typed outcome of a failed guard
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("Login required for {next}")]
    Unauthenticated { next: String },

    #[error("Forbidden")]
    Forbidden,

    #[error("Hidden")]
    NotFound,

    #[error("Already authenticated")]
    AlreadyAuthenticated,
}

impl From<GuardError> for AppError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::Unauthenticated { next } => AppError::Unauthenticated { next },
            GuardError::Forbidden => AppError::Forbidden("Not allowed for this user".to_string()),
            GuardError::NotFound => AppError::NotFound,
            GuardError::AlreadyAuthenticated => AppError::AlreadyAuthenticated,
        }
    }
}

/// Opens a session for `user`
pub fn start_session(
    jar: SignedCookieJar,
    state: &AppState,
    user: &User,
) -> Result<SignedCookieJar, JwtError> {
    let secret = &state.config.auth.secret;
    let auth_hash = jwt::session_auth_hash(&user.password_hash, secret)?;
    let claims = Claims::new(
        user.id,
        auth_hash,
        chrono::Duration::hours(state.config.auth.session_ttl_hours),
    );
    let token = jwt::create_token(&claims, secret)?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.api.production)
        .build();

    Ok(jar.add(cookie))
}

/// Closes the current session, if any
pub fn end_session(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// The user behind a request, if any
#[derive(Debug, Clone)]
pub struct Viewer {
    user: Option<User>,
    path: String,
}

impl Viewer {
    pub fn new(user: Option<User>, path: impl Into<String>) -> Self {
        Self {
            user,
            path: path.into(),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn id(&self) -> Option<Uuid> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn require_login(&self) -> Result<&User, GuardError> {
        self.user.as_ref().ok_or_else(|| GuardError::Unauthenticated {
            next: self.path.clone(),
        })
    }

    pub fn require_anonymous(&self) -> Result<(), GuardError> {
        match self.user {
            Some(_) => Err(GuardError::AlreadyAuthenticated),
            None => Ok(()),
        }
    }

    /// Applies the album access policy for this viewer
    pub fn authorize_album(
        &self,
        album: &Album,
        permission: ResourcePermission,
    ) -> Result<(), GuardError> {
        authorization::authorize_album(album, self.id(), permission).map_err(|err| match err {
            AuthzError::Unauthenticated => GuardError::Unauthenticated {
                next: self.path.clone(),
            },
            AuthzError::NotAuthorized => GuardError::Forbidden,
            AuthzError::Hidden => GuardError::NotFound,
        })
    }
}

async fn resolve_session(state: &AppState, token: &str) -> Result<Option<User>, AppError> {
    let secret = &state.config.auth.secret;

    let claims = match jwt::validate_token(token, secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid session token");
            return Ok(None);
        }
    };

    let Some(user) = state.store.find_user_by_id(claims.sub).await? else {
        tracing::debug!(user_id = %claims.sub, "Session user no longer exists");
        return Ok(None);
    };

    if !user.is_active {
        return Ok(None);
    }

    if jwt::session_auth_hash(&user.password_hash, secret)? != claims.auth_hash {
        tracing::debug!(user_id = %user.id, "Session predates a password change");
        return Ok(None);
    }

    Ok(Some(user))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Nested routers strip their prefix from `parts.uri`
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| &original.0)
            .unwrap_or(&parts.uri);
        let path = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        let jar = SignedCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        let user = match jar.get(SESSION_COOKIE) {
            Some(cookie) => resolve_session(state, cookie.value()).await?,
            None => None,
        };

        Ok(Viewer { user, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use photobook_shared::models::Visibility;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "anna".to_string(),
            email: "anna@example.com".to_string(),
            password_hash: "hash".to_string(),
            is_active: true,
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            avatar_path: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    fn album(author: Uuid, visibility: Visibility) -> Album {
        Album {
            id: Uuid::new_v4(),
            name: "Trip".to_string(),
            age: None,
            description: "d".to_string(),
            title: "t".to_string(),
            location: "l".to_string(),
            banner_path: "album/banner/x.jpg".to_string(),
            author_id: Some(author),
            visibility,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_require_login() {
        let anonymous = Viewer::new(None, "/albums/new");
        assert_eq!(
            anonymous.require_login().unwrap_err(),
            GuardError::Unauthenticated {
                next: "/albums/new".to_string()
            }
        );
        assert!(anonymous.require_anonymous().is_ok());

        let signed_in = Viewer::new(Some(user()), "/");
        assert_eq!(signed_in.require_login().unwrap().username, "anna");
        assert_eq!(
            signed_in.require_anonymous().unwrap_err(),
            GuardError::AlreadyAuthenticated
        );
    }

    #[test]
    fn test_album_guard_keeps_request_path() {
        let owner = user();
        let public = album(owner.id, Visibility::Public);
        let anonymous = Viewer::new(None, "/albums/1/edit");

        assert!(anonymous
            .authorize_album(&public, ResourcePermission::Read)
            .is_ok());
        assert_eq!(
            anonymous
                .authorize_album(&public, ResourcePermission::Write)
                .unwrap_err(),
            GuardError::Unauthenticated {
                next: "/albums/1/edit".to_string()
            }
        );

        let stranger = Viewer::new(Some(user()), "/");
        assert_eq!(
            stranger
                .authorize_album(&public, ResourcePermission::Write)
                .unwrap_err(),
            GuardError::Forbidden
        );

        let private = album(owner.id, Visibility::Private);
        assert_eq!(
            stranger
                .authorize_album(&private, ResourcePermission::Read)
                .unwrap_err(),
            GuardError::NotFound
        );

        let author = Viewer::new(Some(owner), "/");
        assert!(author
            .authorize_album(&private, ResourcePermission::Write)
            .is_ok());
    }

    #[test]
    fn test_guard_error_into_app_error() {
        assert!(matches!(
            AppError::from(GuardError::Forbidden),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            AppError::from(GuardError::NotFound),
            AppError::NotFound
        ));
    }
}
