//! Outbound email
//!
//! Handlers render a message and hand it to a [`Mailer`]. Delivery errors are
//! returned to the caller, which decides how to report them to the user.
//!
//! Implementations:
//!
//! - [`HttpMailer`]: Brevo-compatible transactional email API over HTTPS
//! - [`LogMailer`]: writes messages to the log instead of sending them
//! - [`RecordingMailer`]: keeps messages in memory, optionally failing

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod brevo;
pub mod capture;

pub use brevo::HttpMailer;
pub use capture::{LogMailer, RecordingMailer};

/// A rendered plain-text email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Recipient address
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Mailer is missing settings it needs
    #[error("Mailer misconfigured: {0}")]
    Config(String),

    /// Request could not be made or completed
    #[error("Failed to send email: {0}")]
    Transport(String),

    /// Provider answered with a non-success status
    #[error("Mail provider rejected message (status={status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Something that can deliver an [`EmailMessage`]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Short mailer name for logs
    fn name(&self) -> &str;

    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mail_error_display() {
        let err = MailError::Rejected {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Mail provider rejected message (status=401): unauthorized"
        );
    }
}
