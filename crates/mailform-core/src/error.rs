//! Error types for the core library.

use mailform_smtp::Transcript;
use thiserror::Error;

/// Reasons a delivery attempt failed.
///
/// Every variant carries a diagnostic meant for operators: it may name
/// hosts and paths, but never passwords, API keys or message bodies.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// A setting the selected transport needs is empty.
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Socket, TLS connect or HTTP transport failure.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Server answered with an unexpected (non-permanent) code.
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// STARTTLS or implicit TLS negotiation failed.
    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    /// Server refused the message (5xx SMTP reply or non-2xx HTTP status).
    #[error("Remote rejection: {0}")]
    RemoteRejection(String),

    /// The request body could not be encoded.
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// The local mail agent could not be run or refused the message.
    #[error("Local submission failed: {0}")]
    Submission(String),
}

impl DeliveryError {
    /// Classifies an SMTP session error, appending the session transcript.
    #[must_use]
    pub fn from_smtp(err: &mailform_smtp::Error, transcript: &Transcript) -> Self {
        use mailform_smtp::Error as E;

        let detail = if transcript.is_empty() {
            err.to_string()
        } else {
            format!("{err}\n--- SMTP transcript ---\n{transcript}")
        };

        match err {
            E::Io(_) | E::Timeout(_) | E::NoResponse => Self::Connection(detail),
            E::Tls(_) => Self::Handshake(detail),
            E::UnexpectedReply { .. } if err.is_permanent() => Self::RemoteRejection(detail),
            E::UnexpectedReply { .. }
            | E::Protocol(_)
            | E::InvalidAddress(_)
            | E::InvalidState(_) => Self::Protocol(detail),
        }
    }
}

/// Invalid value in the process environment.
#[derive(Debug, Error)]
#[error("Invalid value for {name}: {value:?}")]
pub struct ConfigError {
    /// Variable name.
    pub name: &'static str,
    /// Offending value.
    pub value: String,
}
