//! Direct SMTP delivery.

use std::time::Duration;

use chrono::{DateTime, Utc};
use mailform_smtp::connection::{connect, connect_tls};
use mailform_smtp::{Address, Client, Transcript};

use crate::config::{Encryption, Sender, SmtpConfig};
use crate::error::DeliveryError;
use crate::message::{HeaderBlock, MAILER, Message, encode_header_value, format_mailbox};

/// Delivers one message per SMTP session.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    config: SmtpConfig,
    sender: Sender,
    timeout: Duration,
}

impl SmtpTransport {
    /// Creates a transport bound to the given server settings.
    #[must_use]
    pub const fn new(config: SmtpConfig, sender: Sender, timeout: Duration) -> Self {
        Self {
            config,
            sender,
            timeout,
        }
    }

    /// Server hostname.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Server port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.config.port
    }

    /// Runs one SMTP session for `message`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] whose text includes the session transcript
    /// when any step fails.
    pub async fn send(&self, message: &Message) -> Result<(), DeliveryError> {
        if self.config.host.is_empty() {
            return Err(DeliveryError::ConfigurationMissing(
                "SMTP host is not set (SMTP_HOST)".into(),
            ));
        }

        let mut transcript = Transcript::new();
        let result = self.run_session(message, &mut transcript).await;

        result.map_err(|err| {
            tracing::warn!(
                "SMTP delivery via {}:{} failed: {}",
                self.config.host,
                self.config.port,
                err
            );
            DeliveryError::from_smtp(&err, &transcript)
        })
    }

    async fn run_session(
        &self,
        message: &Message,
        transcript: &mut Transcript,
    ) -> mailform_smtp::Result<()> {
        let SmtpConfig { host, port, .. } = &self.config;
        tracing::debug!("Connecting to {}:{} ({:?})", host, port, self.config.encryption);

        let stream = match self.config.encryption {
            Encryption::Implicit => connect_tls(host, *port, self.timeout).await?,
            Encryption::StartTls | Encryption::None => connect(host, *port, self.timeout).await?,
        };

        let client = Client::from_stream(stream, transcript).await?;
        let client = client.ehlo(&self.config.helo_name).await?;

        let client = if self.config.encryption == Encryption::StartTls {
            client.starttls(host).await?
        } else {
            client
        };

        let envelope_from = Address::new(self.sender.envelope_from.as_str())?;
        let recipient = Address::new(message.recipient_address())?;

        let client = if self.config.has_credentials() {
            client
                .auth_login(&self.config.username, &self.config.password)
                .await?
                .mail_from(&envelope_from)
                .await?
        } else {
            client.mail_from(&envelope_from).await?
        };

        let client = client.rcpt_to(&recipient).await?;
        let client = client.data().await?;
        let client = client
            .send_message(&self.compose(message, Utc::now()))
            .await?;

        // Accepted at this point; QUIT is a courtesy.
        if let Err(err) = client.quit().await {
            tracing::debug!("QUIT failed after delivery: {}", err);
        }
        Ok(())
    }

    /// Renders the RFC 5322 text sent after `DATA`.
    #[must_use]
    pub fn compose(&self, message: &Message, date: DateTime<Utc>) -> String {
        let mut headers = HeaderBlock::new();
        headers
            .push("Date", date.to_rfc2822())
            .push("MIME-Version", "1.0")
            .push("Content-Type", "text/plain; charset=UTF-8")
            .push(
                "From",
                format_mailbox(&self.sender.name, &self.sender.address),
            )
            .push(
                "Reply-To",
                format_mailbox(message.sender_name(), message.sender_address()),
            )
            .push("To", message.recipient_address())
            .push("Subject", encode_header_value(message.subject()))
            .push("X-Mailer", MAILER);
        headers.render(message.body(), "\r\n")
    }
}
