/// Registration, activation, login and logout
///
/// # Endpoints
///
/// - `GET|POST /register` - Sign-up form (anonymous only)
/// - `GET /activate/:uidb64/:token` - Follow the emailed activation link
/// - `GET|POST /login` - Log in (anonymous only)
/// - `GET|POST /logout` - Log out (signed-in only)

use crate::{
    app::AppState,
    emails,
    error::AppResult,
    flash::{self, FlashMessage},
    forms::{self, LoginForm, RegisterForm},
    session::{self, Viewer},
    templates::render_page,
};
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use axum_extra::extract::cookie::SignedCookieJar;
use chrono::Utc;
use photobook_shared::{
    auth::{
        account_token::{decode_uid, TokenPurpose},
        password,
    },
    models::{CreateUser, UpdateUser, User},
    store::{StoreError, UniqueField},
};
use serde::Deserialize;
use serde_json::json;

pub const LOGIN_REQUIRED: &str = "Please log in to see this page.";
pub const BAD_CREDENTIALS: &str = "Please enter a correct username and password.";
pub const INACTIVE_ACCOUNT: &str = "This account is inactive.";
pub const ACTIVATION_EXPIRED: &str = "Activation link is expired";

/// `?next=` on the login page
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Accepts only same-site absolute paths as a post-login target
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && path.bytes().all(|b| b.is_ascii_graphic()) =>
        {
            path
        }
        _ => "/",
    }
}

fn login_action(next: Option<&str>) -> String {
    match next {
        Some(next) => format!("/login?next={}", crate::error::encode_query_value(next)),
        None => "/login".to_string(),
    }
}

/// Loads the user named by the `uidb64` part of an account link
pub(crate) async fn link_user(state: &AppState, uidb64: &str) -> AppResult<Option<User>> {
    match decode_uid(uidb64) {
        Ok(id) => Ok(state.store.find_user_by_id(id).await?),
        Err(_) => Ok(None),
    }
}

fn render_register(
    state: &AppState,
    jar: SignedCookieJar,
    viewer: &Viewer,
    form: &RegisterForm,
    problems: Vec<String>,
) -> AppResult<Response> {
    let page = render_page(
        &state.templates,
        jar,
        viewer,
        flash::errors(problems),
        "accounts/register.html",
        json!({ "form": form }),
    )?;
    Ok(page.into_response())
}

pub async fn register_form(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
) -> AppResult<Response> {
    viewer.require_anonymous()?;
    render_register(&state, jar, &viewer, &RegisterForm::default(), Vec::new())
}

/// Creates an inactive account and emails its activation link
pub async fn register(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    viewer.require_anonymous()?;

    let form = form.cleaned();
    let mut problems = form.problems();
    problems.extend(
        forms::uniqueness_problems(state.store.as_ref(), &form.username, &form.email, None).await?,
    );
    if !problems.is_empty() {
        return render_register(&state, jar, &viewer, &form, problems);
    }

    let password_hash = password::hash_password(&form.password1)?;

    let created = state
        .store
        .create_user(CreateUser {
            username: form.username.clone(),
            email: form.email.clone(),
            password_hash,
            is_active: false,
        })
        .await;

    let user = match created {
        Ok(user) => user,
        Err(StoreError::Conflict(field)) => {
            let problem = match field {
                UniqueField::Username => forms::USERNAME_TAKEN,
                UniqueField::Email => forms::EMAIL_TAKEN,
            };
            return render_register(&state, jar, &viewer, &form, vec![problem.to_string()]);
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    let message = match emails::send_activation_email(&state, &user).await {
        Ok(()) => FlashMessage::success(format!(
            "Dear {}, please go to your email {} inbox and click on the received activation link \
             to confirm and complete the registration. Note: check your spam folder.",
            user.username, user.email
        )),
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to send activation email");
            FlashMessage::error(format!(
                "Problem sending activation email to {}, please check if you typed the correct email",
                user.email
            ))
        }
    };

    Ok(flash::redirect(jar, message, "/"))
}

/// Activates the account named by the link
///
/// The activation token is bound to the inactive state, so a link stops
/// working once it has been used.
pub async fn activate(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Path((uidb64, token)): Path<(String, String)>,
) -> AppResult<Response> {
    let Some(user) = link_user(&state, &uidb64).await? else {
        return Ok(flash::redirect(jar, FlashMessage::error(ACTIVATION_EXPIRED), "/"));
    };

    if let Err(e) = state
        .tokens
        .check_token(TokenPurpose::Activation, &user, &token, Utc::now())
    {
        tracing::debug!(user_id = %user.id, error = %e, "Rejected activation link");
        return Ok(flash::redirect(jar, FlashMessage::error(ACTIVATION_EXPIRED), "/"));
    }

    state
        .store
        .update_user(
            user.id,
            UpdateUser {
                is_active: Some(true),
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(user_id = %user.id, "Account activated");

    Ok(flash::redirect(
        jar,
        FlashMessage::success("Thank you for confirming your email, You can now login"),
        "/login",
    ))
}

fn render_login(
    state: &AppState,
    jar: SignedCookieJar,
    viewer: &Viewer,
    form: &LoginForm,
    next: Option<&str>,
    messages: Vec<FlashMessage>,
) -> AppResult<Response> {
    let page = render_page(
        &state.templates,
        jar,
        viewer,
        messages,
        "accounts/login.html",
        json!({ "form": form, "action": login_action(next) }),
    )?;
    Ok(page.into_response())
}

pub async fn login_form(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
    Query(query): Query<LoginQuery>,
) -> AppResult<Response> {
    viewer.require_anonymous()?;

    let messages = match query.next {
        Some(_) => vec![FlashMessage::info(LOGIN_REQUIRED)],
        None => Vec::new(),
    };

    render_login(
        &state,
        jar,
        &viewer,
        &LoginForm::default(),
        query.next.as_deref(),
        messages,
    )
}

/// Checks credentials and opens a session
pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
    Query(query): Query<LoginQuery>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    viewer.require_anonymous()?;

    let next = query.next.as_deref();
    let username = form.username.trim();

    let user = match state.store.find_user_by_username(username).await? {
        Some(user) if password::verify_password(&form.password, &user.password_hash)? => user,
        _ => {
            tracing::debug!(username = %username, "Login failed");
            return render_login(
                &state,
                jar,
                &viewer,
                &form,
                next,
                vec![FlashMessage::error(BAD_CREDENTIALS)],
            );
        }
    };

    if !user.is_active {
        tracing::debug!(user_id = %user.id, "Login refused for inactive account");
        return render_login(
            &state,
            jar,
            &viewer,
            &form,
            next,
            vec![FlashMessage::error(INACTIVE_ACCOUNT)],
        );
    }

    state.store.record_login(user.id).await?;
    let jar = session::start_session(jar, &state, &user)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(flash::redirect(
        jar,
        FlashMessage::success(format!("Successfully logged in as {}", user.username)),
        safe_next(next),
    ))
}

pub async fn logout(jar: SignedCookieJar, viewer: Viewer) -> AppResult<Response> {
    let user = viewer.require_login()?;
    tracing::info!(user_id = %user.id, "User logged out");

    let jar = session::end_session(jar);
    Ok(flash::redirect(jar, FlashMessage::info("You are logged out."), "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/albums/new")), "/albums/new");
        assert_eq!(safe_next(Some("/albums?x=1")), "/albums?x=1");
        assert_eq!(safe_next(Some("//evil.example.com")), "/");
        assert_eq!(safe_next(Some("https://evil.example.com")), "/");
        assert_eq!(safe_next(Some("/\\evil.example.com")), "/");
        assert_eq!(safe_next(Some("/caf\u{e9}")), "/");
        assert_eq!(safe_next(Some("/a b")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_login_action() {
        assert_eq!(login_action(None), "/login");
        assert_eq!(login_action(Some("/albums/new")), "/login?next=/albums/new");
    }
}
