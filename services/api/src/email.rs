//! Outbound email
//!
//! Delivery goes through the `Mailer` trait so handlers can be exercised
//! with an in-memory double. The SMTP implementation rides lettre's async
//! transport.

use std::sync::Mutex;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::error::{ApiError, ApiResult};

/// SMTP settings
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

impl EmailConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: std::env::var("SMTP_HOST")
                .map_err(|_| anyhow::anyhow!("SMTP_HOST must be set"))?,
            port: std::env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SMTP_PORT must be a port number"))?,
            username: std::env::var("SMTP_EMAIL")
                .map_err(|_| anyhow::anyhow!("SMTP_EMAIL must be set"))?,
            password: std::env::var("SMTP_PASSWORD")
                .map_err(|_| anyhow::anyhow!("SMTP_PASSWORD must be set"))?,
            from_email: std::env::var("FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@devcamp.io".to_string()),
            from_name: std::env::var("FROM_NAME").unwrap_or_else(|_| "DevCamp".to_string()),
        })
    }
}

/// Sends plain-text email
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> ApiResult<()>;
}

/// SMTP-backed mailer
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self { transport, config })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> ApiResult<()> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|_| ApiError::EmailSend)?;
        let message = Message::builder()
            .from(from)
            .to(to.parse().map_err(|_| ApiError::EmailSend)?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|_| ApiError::EmailSend)?;

        self.transport
            .send(message)
            .await
            .map_err(|_| ApiError::EmailSend)?;
        info!(to, subject, "Email sent");
        Ok(())
    }
}

/// A sent message captured by the mock mailer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// In-memory mailer test double; records messages, fails on demand
#[derive(Default)]
pub struct MockMailer {
    pub sent: Mutex<Vec<SentEmail>>,
    pub fail: bool,
}

impl MockMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> ApiResult<()> {
        if self.fail {
            return Err(ApiError::EmailSend);
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentEmail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_records_sent_messages() {
        let mailer = MockMailer::default();
        mailer
            .send("user@devcamp.io", "Welcome", "Hello there")
            .await
            .unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "user@devcamp.io");
        assert_eq!(sent[0].subject, "Welcome");
    }

    #[tokio::test]
    async fn failing_mock_surfaces_the_send_error() {
        let mailer = MockMailer::failing();
        let result = mailer.send("user@devcamp.io", "Welcome", "Hello").await;
        assert!(matches!(result, Err(ApiError::EmailSend)));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }
}
