/// Submitted forms and their validation
///
/// Field-level rules (required, lengths, email format) are declared with
/// `validator` derives. Rules that need more than one field or a lookup
/// (matching passwords, password strength, uniqueness) are checked by the
/// handlers on top of [`Validate`].
///
/// Every form validates into a list of human readable problems; an empty
/// list means the form is acceptable.

use photobook_shared::{
    auth::password,
    models::{User, Visibility},
    store::{Store, StoreResult},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const EMAIL_TAKEN: &str = "A user with that email already exists.";
pub const PASSWORD_MISMATCH: &str = "The two password fields do not match.";

/// Flattens validator errors into messages, ordered by field name
pub fn collect_errors(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field))
            })
        })
        .collect()
}

fn validation_problems<T: Validate>(form: &T) -> Vec<String> {
    match form.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => collect_errors(&errors),
    }
}

/// Checks the username character set
pub fn username_problems(username: &str) -> Vec<String> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');

    if !username.is_empty() && !username.chars().all(allowed) {
        vec!["Enter a valid username. This value may contain only English letters, numbers, and @/./+/-/_ characters.".to_string()]
    } else {
        Vec::new()
    }
}

fn new_password_problems(password1: &str, password2: &str, username: &str, email: &str) -> Vec<String> {
    if password1 != password2 {
        return vec![PASSWORD_MISMATCH.to_string()];
    }
    password::password_problems(password1, username, email)
}

/// Reports taken usernames and emails, ignoring the user `except`
pub async fn uniqueness_problems(
    store: &dyn Store,
    username: &str,
    email: &str,
    except: Option<Uuid>,
) -> StoreResult<Vec<String>> {
    let mut problems = Vec::new();

    if let Some(user) = store.find_user_by_username(username).await? {
        if Some(user.id) != except {
            problems.push(USERNAME_TAKEN.to_string());
        }
    }
    if let Some(user) = store.find_user_by_email(email).await? {
        if Some(user.id) != except {
            problems.push(EMAIL_TAKEN.to_string());
        }
    }

    Ok(problems)
}

/// Sign-up form
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterForm {
    #[validate(length(min = 1, max = 150, message = "Username is required and must be at most 150 characters"))]
    pub username: String,

    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Email must be at most 254 characters")
    )]
    pub email: String,

    #[serde(skip_serializing)]
    pub password1: String,

    #[serde(skip_serializing)]
    pub password2: String,
}

impl RegisterForm {
    /// Normalizes whitespace around the text fields
    pub fn cleaned(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();
        self
    }

    /// Problems that can be found without the store
    pub fn problems(&self) -> Vec<String> {
        let mut problems = validation_problems(self);
        problems.extend(username_problems(&self.username));
        problems.extend(new_password_problems(
            &self.password1,
            &self.password2,
            &self.username,
            &self.email,
        ));
        problems
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,

    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PasswordResetForm {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
}

/// New password, typed twice
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SetPasswordForm {
    pub new_password1: String,
    pub new_password2: String,
}

impl SetPasswordForm {
    pub fn problems(&self, user: &User) -> Vec<String> {
        new_password_problems(
            &self.new_password1,
            &self.new_password2,
            &user.username,
            &user.email,
        )
    }
}

/// Profile edit form, filled from a multipart body
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProfileForm {
    #[validate(length(min = 1, max = 150, message = "Username is required and must be at most 150 characters"))]
    pub username: String,

    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Email must be at most 254 characters")
    )]
    pub email: String,

    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    pub first_name: String,

    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: String,

    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: String,
}

impl ProfileForm {
    /// Prefills the form from the stored record
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            bio: user.bio.clone(),
        }
    }

    pub fn from_fields(fields: &std::collections::HashMap<String, String>) -> Self {
        let field = |name: &str| {
            fields
                .get(name)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        Self {
            username: field("username"),
            email: field("email"),
            first_name: field("first_name"),
            last_name: field("last_name"),
            bio: field("bio"),
        }
    }

    pub fn problems(&self) -> Vec<String> {
        let mut problems = validation_problems(self);
        problems.extend(username_problems(&self.username));
        problems
    }
}

/// Album create and edit form, filled from a multipart body
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AlbumForm {
    #[validate(length(min = 1, max = 700, message = "Name is required and must be at most 700 characters"))]
    pub name: String,

    #[validate(length(max = 20, message = "Age must be at most 20 characters"))]
    pub age: String,

    #[validate(length(min = 1, max = 700, message = "Description is required and must be at most 700 characters"))]
    pub description: String,

    #[validate(length(min = 1, max = 700, message = "Title is required and must be at most 700 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 700, message = "Location is required and must be at most 700 characters"))]
    pub location: String,

    /// Raw submitted value, checked by [`AlbumForm::visibility`]
    pub visibility: String,
}

impl Default for AlbumForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            age: String::new(),
            description: String::new(),
            title: String::new(),
            location: String::new(),
            visibility: Visibility::default().as_str().to_string(),
        }
    }
}

impl AlbumForm {
    pub fn from_fields(fields: &std::collections::HashMap<String, String>) -> Self {
        let field = |name: &str| {
            fields
                .get(name)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        let visibility = match field("visibility") {
            v if v.is_empty() => Visibility::default().as_str().to_string(),
            v => v,
        };

        Self {
            name: field("name"),
            age: field("age"),
            description: field("description"),
            title: field("title"),
            location: field("location"),
            visibility,
        }
    }

    pub fn from_album(album: &photobook_shared::models::Album) -> Self {
        Self {
            name: album.name.clone(),
            age: album.age.clone().unwrap_or_default(),
            description: album.description.clone(),
            title: album.title.clone(),
            location: album.location.clone(),
            visibility: album.visibility.as_str().to_string(),
        }
    }

    pub fn visibility(&self) -> Option<Visibility> {
        self.visibility.parse().ok()
    }

    /// Empty age means "no age"
    pub fn age(&self) -> Option<String> {
        Some(self.age.clone()).filter(|a| !a.is_empty())
    }

    pub fn problems(&self) -> Vec<String> {
        let mut problems = validation_problems(self);
        if self.visibility().is_none() {
            problems.push(format!(
                "Select a valid visibility. {} is not one of the available choices.",
                self.visibility
            ));
        }
        problems
    }
}

/// Choices for the visibility select box
pub fn visibility_options() -> Vec<serde_json::Value> {
    Visibility::all()
        .iter()
        .map(|v| serde_json::json!({ "value": v.as_str(), "label": v.label() }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use photobook_shared::models::CreateUser;
    use photobook_shared::store::MemoryStore;
    use std::collections::HashMap;

    fn register(username: &str, email: &str, p1: &str, p2: &str) -> RegisterForm {
        RegisterForm {
            username: username.to_string(),
            email: email.to_string(),
            password1: p1.to_string(),
            password2: p2.to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        let form = register("anna", "anna@example.com", "Str0ng!Pass", "Str0ng!Pass");
        assert!(form.problems().is_empty());
    }

    #[test]
    fn test_registration_collects_every_problem() {
        let form = register("bad name", "not-an-email", "weak", "weak");
        let problems = form.problems();

        assert!(problems.iter().any(|p| p.contains("valid email")));
        assert!(problems.iter().any(|p| p.contains("valid username")));
        assert!(problems.iter().any(|p| p.contains("at least 8 characters")));
    }

    #[test]
    fn test_password_mismatch() {
        let form = register("anna", "anna@example.com", "Str0ng!Pass", "Str0ng!Pasz");
        assert_eq!(form.problems(), vec![PASSWORD_MISMATCH.to_string()]);
    }

    #[test]
    fn test_username_rules() {
        assert!(username_problems("anna.b+c@d_e-f").is_empty());
        assert!(!username_problems("anna b").is_empty());
        assert!(!username_problems("anna/b").is_empty());
        assert!(!username_problems("j\u{f6}rg").is_empty());

        let long = register(&"a".repeat(151), "a@example.com", "Str0ng!Pass", "Str0ng!Pass");
        assert!(!long.problems().is_empty());
    }

    #[test]
    fn test_email_longer_than_column_is_rejected() {
        let label = "b".repeat(60);
        let email = format!("{}@{}.{}.{}.{}.com", "a".repeat(10), label, label, label, label);
        assert!(email.len() > 254);

        let form = register("anna", &email, "Str0ng!Pass", "Str0ng!Pass");
        assert!(form
            .problems()
            .iter()
            .any(|p| p == "Email must be at most 254 characters"));

        let profile = ProfileForm {
            username: "anna".to_string(),
            email,
            ..Default::default()
        };
        assert!(profile
            .problems()
            .iter()
            .any(|p| p == "Email must be at most 254 characters"));
    }

    #[test]
    fn test_register_form_cleaned() {
        let form = register("  anna ", " anna@example.com ", "x", "x").cleaned();
        assert_eq!(form.username, "anna");
        assert_eq!(form.email, "anna@example.com");
    }

    #[test]
    fn test_register_form_does_not_serialize_passwords() {
        let json = serde_json::to_value(register("a", "a@b.c", "secret1", "secret2")).unwrap();
        assert!(json.get("password1").is_none());
        assert!(json.get("password2").is_none());
    }

    #[test]
    fn test_album_form_defaults_and_choices() {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), " Trip ".to_string());
        fields.insert("description".to_string(), "Beach".to_string());
        fields.insert("title".to_string(), "Summer".to_string());
        fields.insert("location".to_string(), "Zanzibar".to_string());

        let form = AlbumForm::from_fields(&fields);
        assert_eq!(form.name, "Trip");
        assert_eq!(form.visibility(), Some(Visibility::Public));
        assert_eq!(form.age(), None);
        assert!(form.problems().is_empty());

        fields.insert("visibility".to_string(), "secret".to_string());
        fields.insert("age".to_string(), "x".repeat(21));
        let problems = AlbumForm::from_fields(&fields).problems();
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn test_album_form_requires_fields() {
        let problems = AlbumForm::default().problems();
        assert_eq!(problems.len(), 4);
    }

    #[tokio::test]
    async fn test_uniqueness_problems() {
        let store = MemoryStore::new();
        let user = store
            .create_user(CreateUser {
                username: "anna".to_string(),
                email: "anna@example.com".to_string(),
                password_hash: "hash".to_string(),
                is_active: true,
            })
            .await
            .unwrap();

        let problems = uniqueness_problems(&store, "anna", "ANNA@example.com", None)
            .await
            .unwrap();
        assert_eq!(problems, vec![USERNAME_TAKEN.to_string(), EMAIL_TAKEN.to_string()]);

        let problems = uniqueness_problems(&store, "anna", "anna@example.com", Some(user.id))
            .await
            .unwrap();
        assert!(problems.is_empty());
    }
}
