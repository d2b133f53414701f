//! Delivery transports and transport selection.
//!
//! The three transports form a closed set, so they are variants of one
//! [`Transport`] enum rather than trait objects. A transport is chosen once
//! per delivery attempt from the [`TransportConfig`].

mod http_api;
mod local_agent;
mod smtp;

pub use http_api::HttpApiTransport;
pub use local_agent::LocalAgentTransport;
pub use smtp::SmtpTransport;

use crate::config::{TransportConfig, TransportKind};
use crate::error::DeliveryError;
use crate::message::Message;

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    /// The message was accepted by the transport.
    Sent,
    /// The attempt failed.
    Failed {
        /// Operator-only detail: may name hosts and paths, never secrets.
        diagnostic: String,
    },
}

impl DeliveryResult {
    /// Returns true for [`DeliveryResult::Sent`].
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }

    /// Returns the failure diagnostic, if any.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Sent => None,
            Self::Failed { diagnostic } => Some(diagnostic),
        }
    }
}

impl From<Result<(), DeliveryError>> for DeliveryResult {
    fn from(result: Result<(), DeliveryError>) -> Self {
        match result {
            Ok(()) => Self::Sent,
            Err(err) => Self::Failed {
                diagnostic: err.to_string(),
            },
        }
    }
}

/// The configured way of sending mail.
#[derive(Debug, Clone)]
pub enum Transport {
    /// Local `sendmail`-compatible agent.
    LocalAgent(LocalAgentTransport),
    /// Direct SMTP session.
    Smtp(SmtpTransport),
    /// HTTPS email API.
    HttpApi(HttpApiTransport),
}

impl Transport {
    /// Builds the transport selected by `config`, bound to its settings.
    ///
    /// Settings of the other transports are ignored.
    #[must_use]
    pub fn from_config(config: &TransportConfig) -> Self {
        match config.transport {
            TransportKind::LocalAgent => Self::LocalAgent(LocalAgentTransport::new(
                config.local_agent.clone(),
                config.sender.clone(),
                config.timeout,
            )),
            TransportKind::Smtp => Self::Smtp(SmtpTransport::new(
                config.smtp.clone(),
                config.sender.clone(),
                config.timeout,
            )),
            TransportKind::HttpApi => Self::HttpApi(HttpApiTransport::new(
                config.http_api.clone(),
                &config.sender,
                config.timeout,
            )),
        }
    }

    /// Which transport this is.
    #[must_use]
    pub const fn kind(&self) -> TransportKind {
        match self {
            Self::LocalAgent(_) => TransportKind::LocalAgent,
            Self::Smtp(_) => TransportKind::Smtp,
            Self::HttpApi(_) => TransportKind::HttpApi,
        }
    }

    /// Attempts delivery, keeping the error classification.
    ///
    /// # Errors
    ///
    /// Returns the [`DeliveryError`] of the failed step.
    pub async fn try_deliver(&self, message: &Message) -> Result<(), DeliveryError> {
        match self {
            Self::LocalAgent(transport) => transport.send(message).await,
            Self::Smtp(transport) => transport.send(message).await,
            Self::HttpApi(transport) => transport.send(message).await,
        }
    }

    /// Attempts delivery once. Failures are reported, never raised.
    pub async fn deliver(&self, message: &Message) -> DeliveryResult {
        let result = self.try_deliver(message).await;
        match &result {
            Ok(()) => tracing::info!("Message delivered via {}", self.kind()),
            Err(err) => tracing::warn!("Delivery via {} failed: {}", self.kind(), kind_of(err)),
        }
        result.into()
    }
}

// Short label for logs; the full diagnostic may be long.
const fn kind_of(err: &DeliveryError) -> &'static str {
    match err {
        DeliveryError::ConfigurationMissing(_) => "configuration missing",
        DeliveryError::Connection(_) => "connection failure",
        DeliveryError::Protocol(_) => "protocol violation",
        DeliveryError::Handshake(_) => "handshake failure",
        DeliveryError::RemoteRejection(_) => "remote rejection",
        DeliveryError::Encoding(_) => "encoding failure",
        DeliveryError::Submission(_) => "submission failure",
    }
}
