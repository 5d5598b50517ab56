//! Outgoing email
//!
//! [`SmtpMailer`] sends plain-text mails over SMTP with `lettre`. When `SMTP_HOST` is not
//! configured the [`LogMailer`] is used instead, it only writes the mail to the log.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::AsyncSmtpTransport;
use lettre::AsyncTransport;
use lettre::Message;
use lettre::Tokio1Executor;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use thiserror::Error;

use crate::utils::env_var_or_else;
use crate::utils::env_var_parsed_or;

/// Default SMTP port (STARTTLS)
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set
const DEFAULT_FROM_ADDRESS: &str = "noreply@travel-journal.local";

/// Mail delivery errors
#[derive(Debug, Error)]
pub enum MailError {
    /// SMTP transport-level failure
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// Sender or recipient could not be parsed
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The message could not be assembled
    #[error("Email build error: {0}")]
    Build(String),
}

/// A plain-text mail
#[derive(Clone, Debug)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a single mail
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Mail transport shared by all requests
pub type SharedMailer = Arc<dyn Mailer>;

/// SMTP configuration
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from_address: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl SmtpConfig {
    /// Load the configuration from the environment
    ///
    /// Returns `None` when `SMTP_HOST` is not set
    ///
    /// | Variable        | Default                        |
    /// |-----------------|--------------------------------|
    /// | `SMTP_HOST`     | (required)                     |
    /// | `SMTP_PORT`     | `587`                          |
    /// | `SMTP_FROM`     | `noreply@travel-journal.local` |
    /// | `SMTP_USER`     |                                |
    /// | `SMTP_PASSWORD` |                                |
    pub fn from_env() -> anyhow::Result<Option<Self>> {
        let host = env_var_or_else("SMTP_HOST", String::new);
        if host.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self {
            host,
            port: env_var_parsed_or("SMTP_PORT", DEFAULT_SMTP_PORT)?,
            from_address: env_var_or_else("SMTP_FROM", || DEFAULT_FROM_ADDRESS.to_string()),
            user: std::env::var("SMTP_USER").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
        }))
    }
}

/// Sends mails over SMTP
pub struct SmtpMailer {
    config: SmtpConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port);

        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            config,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(message.to.parse()?)
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|err| MailError::Build(err.to_string()))?;

        self.transport.send(email).await?;

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent");

        Ok(())
    }
}

/// Writes mails to the log instead of sending them
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "SMTP not configured, email not sent:\n{}",
            message.body
        );

        Ok(())
    }
}

/// Setup the mailer based on the environment
pub fn setup() -> anyhow::Result<SharedMailer> {
    match SmtpConfig::from_env()? {
        Some(config) => {
            tracing::info!("Sending email via {}:{}", config.host, config.port);

            Ok(Arc::new(SmtpMailer::new(config)?))
        }
        None => {
            tracing::info!("`SMTP_HOST` is not set, emails will only be logged");

            Ok(Arc::new(LogMailer))
        }
    }
}
