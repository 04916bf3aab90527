/// HTML and email templates
///
/// Templates are compiled into the binary and loaded into one `minijinja`
/// environment at startup. Files ending in `.html` are autoescaped; the
/// `.txt` email bodies are not.
///
/// Every page receives two extra variables besides its own context:
///
/// - `current_user`: the signed-in user, or none
/// - `messages`: flash messages to show once

use crate::{
    error::{AppError, AppResult},
    flash::{self, FlashMessage},
    session::Viewer,
};
use axum::response::Html;
use axum_extra::extract::cookie::SignedCookieJar;
use minijinja::Environment;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("accounts/register.html", include_str!("../templates/accounts/register.html")),
    ("accounts/login.html", include_str!("../templates/accounts/login.html")),
    ("accounts/password_reset.html", include_str!("../templates/accounts/password_reset.html")),
    ("accounts/set_password.html", include_str!("../templates/accounts/set_password.html")),
    ("profile/edit.html", include_str!("../templates/profile/edit.html")),
    ("profile/view.html", include_str!("../templates/profile/view.html")),
    ("albums/list.html", include_str!("../templates/albums/list.html")),
    ("albums/form.html", include_str!("../templates/albums/form.html")),
    ("albums/detail.html", include_str!("../templates/albums/detail.html")),
    ("emails/activate_account.txt", include_str!("../templates/emails/activate_account.txt")),
    ("emails/reset_password.txt", include_str!("../templates/emails/reset_password.txt")),
];

/// Formats an RFC 3339 timestamp as `YYYY-MM-DD`, leaving anything else as is
fn date_filter(value: String) -> String {
    match chrono::DateTime::parse_from_rfc3339(&value) {
        Ok(timestamp) => timestamp.format("%Y-%m-%d").to_string(),
        Err(_) => value,
    }
}

/// Compiled template set, cheap to clone
#[derive(Clone)]
pub struct Templates {
    env: Arc<Environment<'static>>,
}

impl Templates {
    /// Loads every embedded template
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to parse.
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        env.add_filter("date", date_filter);

        Ok(Self { env: Arc::new(env) })
    }

    /// Renders a template with a plain serializable context
    pub fn render_raw<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(ctx)
    }

    /// Renders a page template for `viewer`
    pub fn render(
        &self,
        name: &str,
        viewer: &Viewer,
        messages: &[FlashMessage],
        ctx: Value,
    ) -> AppResult<String> {
        let mut ctx = match ctx {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(AppError::Internal(format!(
                    "Template context for {} must be an object, got {}",
                    name, other
                )))
            }
        };

        ctx.insert("current_user".to_string(), to_value(viewer.user())?);
        ctx.insert("messages".to_string(), to_value(messages)?);

        Ok(self.render_raw(name, Value::Object(ctx))?)
    }
}

fn to_value<S: Serialize>(value: S) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(format!("Template context: {}", e)))
}

/// Renders a full page, consuming queued flash messages
///
/// `extra` messages belong to this response only (form errors on a
/// re-rendered form) and are shown after the queued ones.
pub fn render_page(
    templates: &Templates,
    jar: SignedCookieJar,
    viewer: &Viewer,
    extra: Vec<FlashMessage>,
    name: &str,
    ctx: Value,
) -> AppResult<(SignedCookieJar, Html<String>)> {
    let (jar, mut messages) = flash::take(jar);
    messages.extend(extra);

    let body = templates.render(name, viewer, &messages, ctx)?;
    Ok((jar, Html(body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_templates_parse() {
        let templates = Templates::new().unwrap();
        for &(name, _) in TEMPLATES {
            assert!(templates.env.get_template(name).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_html_is_escaped() {
        let templates = Templates::new().unwrap();
        let viewer = Viewer::new(None, "/");
        let html = templates
            .render(
                "home.html",
                &viewer,
                &[FlashMessage::error("<script>alert(1)</script>")],
                json!({ "public_albums": [], "own_albums": [] }),
            )
            .unwrap();

        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
    }

    #[test]
    fn test_email_is_not_escaped() {
        let templates = Templates::new().unwrap();
        let body = templates
            .render_raw(
                "emails/activate_account.txt",
                json!({
                    "username": "o'neil",
                    "link": "http://localhost:8080/activate/abc/1-ff?x=1&y=2",
                }),
            )
            .unwrap();

        assert!(body.contains("o'neil"));
        assert!(body.contains("/activate/abc/1-ff?x=1&y=2"));
    }

    #[test]
    fn test_rejects_non_object_context() {
        let templates = Templates::new().unwrap();
        let viewer = Viewer::new(None, "/");
        assert!(templates
            .render("home.html", &viewer, &[], json!([1, 2]))
            .is_err());
    }

    #[test]
    fn test_date_filter() {
        assert_eq!(date_filter("2025-03-01T10:00:00Z".to_string()), "2025-03-01");
        assert_eq!(
            date_filter("2025-03-01T23:59:59.123456+02:00".to_string()),
            "2025-03-01"
        );
        assert_eq!(date_filter("last summer".to_string()), "last summer");
        assert_eq!(date_filter("2025-03".to_string()), "2025-03");
    }
}
