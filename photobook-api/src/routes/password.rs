/// Password change and password reset
///
/// # Endpoints
///
/// - `GET|POST /password-change` - Set a new password (signed-in only)
/// - `GET|POST /password-reset` - Ask for a reset link (anonymous only)
/// - `GET|POST /password-reset-confirm/:uidb64/:token` - Set a new password from a reset link
///
/// The reset request answers with the same message whether or not the
/// address belongs to an account.

use crate::{
    app::AppState,
    emails,
    error::AppResult,
    flash::{self, FlashMessage},
    forms::{collect_errors, PasswordResetForm, SetPasswordForm},
    routes::accounts::link_user,
    session::{self, Viewer},
    templates::render_page,
};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Form,
};
use axum_extra::extract::cookie::SignedCookieJar;
use chrono::Utc;
use photobook_shared::{
    auth::{account_token::TokenPurpose, password},
    models::{UpdateUser, User},
};
use serde_json::json;
use validator::Validate;

pub const RESET_SENT: &str = "Password reset sent. We have emailed you instructions for setting your password, \
     if an account exists with the email entered. You should receive them shortly. If you do not receive an email, \
     please make sure you have entered the address you registered with, and check your spam folder.";
pub const RESET_SEND_FAILED: &str = "Problem sending password reset email, server busy";
pub const RESET_LINK_INVALID: &str = "The password reset link is invalid or has expired.";

fn render_set_password(
    state: &AppState,
    jar: SignedCookieJar,
    viewer: &Viewer,
    heading: &str,
    action: &str,
    problems: Vec<String>,
) -> AppResult<Response> {
    let page = render_page(
        &state.templates,
        jar,
        viewer,
        flash::errors(problems),
        "accounts/set_password.html",
        json!({ "heading": heading, "action": action }),
    )?;
    Ok(page.into_response())
}

async fn store_password(state: &AppState, user: &User, new_password: &str) -> AppResult<()> {
    let password_hash = password::hash_password(new_password)?;
    state
        .store
        .update_user(
            user.id,
            UpdateUser {
                password_hash: Some(password_hash),
                ..Default::default()
            },
        )
        .await?;
    Ok(())
}

pub async fn change_form(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
) -> AppResult<Response> {
    viewer.require_login()?;
    render_set_password(
        &state,
        jar,
        &viewer,
        "Change your password",
        "/password-change",
        Vec::new(),
    )
}

/// Stores a new password and ends the current session
pub async fn change(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
    Form(form): Form<SetPasswordForm>,
) -> AppResult<Response> {
    let user = viewer.require_login()?;

    let problems = form.problems(user);
    if !problems.is_empty() {
        return render_set_password(
            &state,
            jar,
            &viewer,
            "Change your password",
            "/password-change",
            problems,
        );
    }

    store_password(&state, user, &form.new_password1).await?;
    tracing::info!(user_id = %user.id, "Password changed");

    let jar = session::end_session(jar);
    Ok(flash::redirect(
        jar,
        FlashMessage::success("Successfully changed your password"),
        "/login",
    ))
}

fn render_reset_request(
    state: &AppState,
    jar: SignedCookieJar,
    viewer: &Viewer,
    form: &PasswordResetForm,
    problems: Vec<String>,
) -> AppResult<Response> {
    let page = render_page(
        &state.templates,
        jar,
        viewer,
        flash::errors(problems),
        "accounts/password_reset.html",
        json!({ "form": form }),
    )?;
    Ok(page.into_response())
}

pub async fn reset_form(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
) -> AppResult<Response> {
    viewer.require_anonymous()?;
    render_reset_request(&state, jar, &viewer, &PasswordResetForm::default(), Vec::new())
}

/// Emails a reset link if the address belongs to an account
pub async fn reset_request(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
    Form(form): Form<PasswordResetForm>,
) -> AppResult<Response> {
    viewer.require_anonymous()?;

    let form = PasswordResetForm {
        email: form.email.trim().to_string(),
    };
    if let Err(errors) = form.validate() {
        return render_reset_request(&state, jar, &viewer, &form, collect_errors(&errors));
    }

    match state.store.find_user_by_email(&form.email).await? {
        Some(user) => {
            if let Err(e) = emails::send_password_reset_email(&state, &user).await {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to send password reset email");
                return Ok(flash::redirect(jar, FlashMessage::error(RESET_SEND_FAILED), "/"));
            }
        }
        None => tracing::debug!("Password reset requested for unknown address"),
    }

    Ok(flash::redirect(jar, FlashMessage::success(RESET_SENT), "/"))
}

/// Resolves a reset link to its user, if the link is still valid
async fn reset_link_user(state: &AppState, uidb64: &str, token: &str) -> AppResult<Option<User>> {
    let Some(user) = link_user(state, uidb64).await? else {
        return Ok(None);
    };

    match state
        .tokens
        .check_token(TokenPurpose::PasswordReset, &user, token, Utc::now())
    {
        Ok(()) => Ok(Some(user)),
        Err(e) => {
            tracing::debug!(user_id = %user.id, error = %e, "Rejected password reset link");
            Ok(None)
        }
    }
}

pub async fn reset_confirm_form(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
    Path((uidb64, token)): Path<(String, String)>,
) -> AppResult<Response> {
    if reset_link_user(&state, &uidb64, &token).await?.is_none() {
        return Ok(flash::redirect(jar, FlashMessage::error(RESET_LINK_INVALID), "/"));
    }

    let action = format!("/password-reset-confirm/{}/{}", uidb64, token);
    render_set_password(&state, jar, &viewer, "Set a new password", &action, Vec::new())
}

/// Stores the new password chosen through a reset link
pub async fn reset_confirm(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    viewer: Viewer,
    Path((uidb64, token)): Path<(String, String)>,
    Form(form): Form<SetPasswordForm>,
) -> AppResult<Response> {
    let Some(user) = reset_link_user(&state, &uidb64, &token).await? else {
        return Ok(flash::redirect(jar, FlashMessage::error(RESET_LINK_INVALID), "/"));
    };

    let problems = form.problems(&user);
    if !problems.is_empty() {
        let action = format!("/password-reset-confirm/{}/{}", uidb64, token);
        return render_set_password(&state, jar, &viewer, "Set a new password", &action, problems);
    }

    store_password(&state, &user, &form.new_password1).await?;
    tracing::info!(user_id = %user.id, "Password reset");

    Ok(flash::redirect(
        jar,
        FlashMessage::success("Your password has been successfully reset. You may now log in."),
        "/login",
    ))
}
