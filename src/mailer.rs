//! Outbound transactional email.
//!
//! - [`ResendMailer`] posts to the Resend HTTP API with a bearer key
//! - [`LogMailer`] only logs what would be sent (development)
//!
//! Every failure mode is reported as a [`MailError`]; the sweep turns those
//! into error counts instead of aborting.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::EmailConfig;

/// Reasons a send can fail.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("email API key is not configured")]
    MissingCredential,

    #[error("email transport failed: {0}")]
    Transport(String),

    #[error("email provider rejected the message with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// A single transactional email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl OutgoingEmail {
    pub fn validate(&self) -> Result<(), MailError> {
        if self.to.trim().is_empty() {
            return Err(MailError::InvalidMessage("recipient is empty".to_string()));
        }
        if self.from.trim().is_empty() {
            return Err(MailError::InvalidMessage("sender is empty".to_string()));
        }
        Ok(())
    }
}

/// Email delivery backend.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one email. `Ok(())` means the provider accepted it.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;

    /// Whether the backend has what it needs to attempt a send.
    fn is_configured(&self) -> bool;
}

/// Mailer for the Resend HTTP API (`POST /emails`).
#[derive(Debug, Clone)]
pub struct ResendMailer {
    client: Client,
    api_url: String,
    api_key: String,
}

impl ResendMailer {
    /// Build a mailer from configuration.
    ///
    /// The HTTP client carries the configured timeout so a hung provider
    /// cannot stall the sweep.
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MailError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.trim().to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/emails", self.api_url)
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if !self.is_configured() {
            return Err(MailError::MissingCredential);
        }
        email.validate()?;

        debug!(to = %email.to, subject = %email.subject, "Sending email via Resend");

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Mailer that logs message metadata and reports success.
///
/// Bodies are never logged; only sender, recipient and subject.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        email.validate()?;
        info!(
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            html_bytes = email.html.len(),
            "Email not sent (log mailer)"
        );
        Ok(())
    }

    fn is_configured(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            from: "PharmaGest <noreply@pharmagest.sn>".to_string(),
            to: "owner@example.sn".to_string(),
            subject: "Test".to_string(),
            html: "<p>Bonjour</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let config = EmailConfig {
            api_key: "  ".to_string(),
            // Unroutable: a request here would error differently.
            api_url: "http://127.0.0.1:9".to_string(),
            ..EmailConfig::default()
        };
        let mailer = ResendMailer::new(&config).unwrap();

        assert!(!mailer.is_configured());
        assert!(matches!(
            mailer.send(&email()).await,
            Err(MailError::MissingCredential)
        ));
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let config = EmailConfig {
            api_key: "re_test".to_string(),
            api_url: "https://api.resend.com/".to_string(),
            ..EmailConfig::default()
        };
        let mailer = ResendMailer::new(&config).unwrap();
        assert_eq!(mailer.endpoint(), "https://api.resend.com/emails");
    }

    #[test]
    fn log_mailer_accepts_valid_email() {
        let result = tokio_test::block_on(LogMailer.send(&email()));
        assert!(result.is_ok());
    }

    #[test]
    fn empty_recipient_is_invalid() {
        let mut message = email();
        message.to = String::new();
        assert!(matches!(
            message.validate(),
            Err(MailError::InvalidMessage(_))
        ));
    }
}
