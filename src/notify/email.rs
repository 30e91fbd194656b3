//! SMTP email sink.
//!
//! Sends each alert to the configured mailbox, which is also used as the
//! sender and reply-to address. Port 465 uses implicit TLS; any other
//! port negotiates STARTTLS.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use super::NotificationSink;
use crate::config::EmailSettings;
use crate::error::DeliveryError;

/// Port that expects TLS from the first byte.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Email sink backed by an async SMTP transport.
pub struct EmailSink {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    mailbox: Mailbox,
    description: String,
}

impl EmailSink {
    pub fn builder() -> EmailSinkBuilder {
        EmailSinkBuilder::default()
    }

    /// Build a sink from loaded settings.
    pub fn from_settings(settings: &EmailSettings) -> Result<Self, DeliveryError> {
        Self::builder()
            .host(&settings.host)
            .port(settings.port)
            .credentials(&settings.address, &settings.password)
            .build()
    }
}

/// Build a plain-text message addressed from, to and reply-to `mailbox`.
fn compose(mailbox: &Mailbox, subject: &str, body: &str) -> Result<Message, DeliveryError> {
    Message::builder()
        .from(mailbox.clone())
        .to(mailbox.clone())
        .reply_to(mailbox.clone())
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| DeliveryError::Message(e.to_string()))
}

#[async_trait]
impl NotificationSink for EmailSink {
    async fn send(&self, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let message = compose(&self.mailbox, subject, body)?;
        debug!(to = %self.mailbox, subject, "Prepared email message");

        self.transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        info!(to = %self.mailbox, subject, "Email alert sent");
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl std::fmt::Debug for EmailSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailSink")
            .field("description", &self.description)
            .finish()
    }
}

/// Builder for [`EmailSink`].
#[derive(Default)]
pub struct EmailSinkBuilder {
    host: Option<String>,
    port: Option<u16>,
    address: Option<String>,
    password: Option<String>,
}

impl EmailSinkBuilder {
    /// SMTP server host name.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// SMTP server port (default: 587).
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Mailbox address and password used to log in and send.
    pub fn credentials(mut self, address: impl Into<String>, password: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self.password = Some(password.into());
        self
    }

    pub fn build(self) -> Result<EmailSink, DeliveryError> {
        let host = self.host.unwrap_or_else(|| "localhost".to_string());
        let port = self.port.unwrap_or(587);
        let address = self.address.unwrap_or_default();
        let password = self.password.unwrap_or_default();

        let mailbox: Mailbox = address
            .parse()
            .map_err(|_| DeliveryError::Address(address.clone()))?;

        let relay = if port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
        }
        .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let transport = relay
            .port(port)
            .credentials(Credentials::new(address.clone(), password))
            .build();

        Ok(EmailSink {
            transport,
            mailbox,
            description: format!("smtp: {}:{} -> {}", host, port, address),
        })
    }
}
