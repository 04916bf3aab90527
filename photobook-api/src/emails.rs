/// Account emails: activation and password reset links
///
/// Both emails carry an absolute link of the form
/// `{protocol}://{domain}/{route}/{uidb64}/{token}` built from the site
/// configuration. Sending is best effort: callers report a failure to the
/// user and carry on.

use crate::app::AppState;
use chrono::Utc;
use photobook_shared::{
    auth::account_token::{encode_uid, TokenError, TokenPurpose},
    mail::{EmailMessage, MailError},
    models::User,
};
use serde_json::json;

pub const ACTIVATION_SUBJECT: &str = "Activate your user account.";
pub const PASSWORD_RESET_SUBJECT: &str = "Password Reset Request";

/// Error type for building and sending an account email
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Failed to create account token: {0}")]
    Token(#[from] TokenError),

    #[error("Failed to render email: {0}")]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    Mail(#[from] MailError),
}

fn route_for(purpose: TokenPurpose) -> &'static str {
    match purpose {
        TokenPurpose::Activation => "/activate",
        TokenPurpose::PasswordReset => "/password-reset-confirm",
    }
}

/// Site-relative link for `user`, valid from now
pub fn account_path(
    state: &AppState,
    purpose: TokenPurpose,
    user: &User,
) -> Result<String, TokenError> {
    let token = state.tokens.make_token(purpose, user, Utc::now())?;
    Ok(format!(
        "{}/{}/{}",
        route_for(purpose),
        encode_uid(user.id),
        token
    ))
}

async fn send_account_email(
    state: &AppState,
    purpose: TokenPurpose,
    user: &User,
) -> Result<(), EmailError> {
    let (template, subject) = match purpose {
        TokenPurpose::Activation => ("emails/activate_account.txt", ACTIVATION_SUBJECT),
        TokenPurpose::PasswordReset => ("emails/reset_password.txt", PASSWORD_RESET_SUBJECT),
    };

    let link = state.config.site_url(&account_path(state, purpose, user)?);
    let body = state.templates.render_raw(
        template,
        json!({
            "username": user.username,
            "link": link,
            "ttl_hours": state.tokens.ttl().num_hours(),
        }),
    )?;

    let message = EmailMessage::new(&user.email, subject, body);
    state.mailer.send(&message).await?;

    tracing::info!(
        user_id = %user.id,
        mailer = state.mailer.name(),
        subject,
        "Account email sent"
    );

    Ok(())
}

pub async fn send_activation_email(state: &AppState, user: &User) -> Result<(), EmailError> {
    send_account_email(state, TokenPurpose::Activation, user).await
}

pub async fn send_password_reset_email(state: &AppState, user: &User) -> Result<(), EmailError> {
    send_account_email(state, TokenPurpose::PasswordReset, user).await
}
