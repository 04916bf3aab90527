use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{EmailMessage, MailError, Mailer};

/// Default transactional email endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody {
    sender: EmailAddress,
    to: Vec<EmailAddress>,
    subject: String,
    text_content: String,
}

/// Sends mail through a Brevo-compatible JSON API
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    sender_email: String,
    sender_name: Option<String>,
}

impl HttpMailer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        sender_email: impl Into<String>,
        sender_name: Option<String>,
    ) -> Result<Self, MailError> {
        let api_key = api_key.into().trim().to_string();
        let sender_email = sender_email.into().trim().to_string();
        if api_key.is_empty() {
            return Err(MailError::Config("API key is required".to_string()));
        }
        if sender_email.is_empty() {
            return Err(MailError::Config("sender email is required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("photobook/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MailError::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            sender_email,
            sender_name,
        })
    }

    fn body(&self, message: &EmailMessage) -> SendEmailBody {
        SendEmailBody {
            sender: EmailAddress {
                email: self.sender_email.clone(),
                name: self.sender_name.clone(),
            },
            to: vec![EmailAddress {
                email: message.to.clone(),
                name: None,
            }],
            subject: message.subject.clone(),
            text_content: message.body.clone(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        debug!(to = %message.to, subject = %message.subject, "Sending email");

        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .header("Accept", "application/json")
            .json(&self.body(message))
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "Mail provider rejected message");
        Err(MailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_key_and_sender() {
        assert!(matches!(
            HttpMailer::new(DEFAULT_ENDPOINT, " ", "noreply@example.com", None),
            Err(MailError::Config(_))
        ));
        assert!(matches!(
            HttpMailer::new(DEFAULT_ENDPOINT, "key", "", None),
            Err(MailError::Config(_))
        ));
    }

    #[test]
    fn test_payload_shape() {
        let mailer = HttpMailer::new(
            DEFAULT_ENDPOINT,
            "key",
            "noreply@example.com",
            Some("Photobook".to_string()),
        )
        .unwrap();
        let message = EmailMessage::new("neema@example.com", "Hello", "Body text");

        let json = serde_json::to_value(mailer.body(&message)).unwrap();
        assert_eq!(json["sender"]["email"], "noreply@example.com");
        assert_eq!(json["sender"]["name"], "Photobook");
        assert_eq!(json["to"][0]["email"], "neema@example.com");
        assert!(json["to"][0].get("name").is_none());
        assert_eq!(json["subject"], "Hello");
        assert_eq!(json["textContent"], "Body text");
    }
}
