//! Error types for SMTP operations.

use std::io;

use crate::types::{ReplyClass, ReplyCode};

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A network operation did not finish in time.
    #[error("Timed out while {0}")]
    Timeout(&'static str),

    /// The server closed the connection before sending a reply.
    #[error("No response from server")]
    NoResponse,

    /// TLS setup or handshake error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Server answered a command with a code the client did not expect.
    #[error("{command} failed with {code}: {message}")]
    UnexpectedReply {
        /// Command that was answered (e.g. `RCPT TO`).
        command: &'static str,
        /// Reply code (e.g., 550).
        code: u16,
        /// Reply text from the server.
        message: String,
    },

    /// Protocol error (malformed reply).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Invalid state for operation.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),
}

impl Error {
    /// Creates an unexpected-reply error.
    #[must_use]
    pub fn unexpected_reply(command: &'static str, code: u16, message: impl Into<String>) -> Self {
        Self::UnexpectedReply {
            command,
            code,
            message: message.into(),
        }
    }

    /// Returns the reply code carried by this error, if any.
    #[must_use]
    pub const fn reply_code(&self) -> Option<u16> {
        match self {
            Self::UnexpectedReply { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Class of the carried reply code; [`ReplyClass::Unknown`] for errors
    /// that did not come from a reply.
    #[must_use]
    pub const fn reply_class(&self) -> ReplyClass {
        match self.reply_code() {
            Some(code) => ReplyCode::new(code).class(),
            None => ReplyClass::Unknown,
        }
    }

    /// Returns true for a 5xx reply.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self.reply_class(), ReplyClass::Permanent)
    }

    /// Returns true for a 4xx reply.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.reply_class(), ReplyClass::Transient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_reply_codes() {
        let err = Error::unexpected_reply("RCPT TO", 550, "no such user");
        assert!(err.is_permanent());
        assert!(!err.is_transient());
        assert_eq!(err.reply_code(), Some(550));
        assert_eq!(err.to_string(), "RCPT TO failed with 550: no such user");

        let err = Error::unexpected_reply("MAIL FROM", 451, "try later");
        assert!(err.is_transient());
        assert!(!Error::NoResponse.is_permanent());
        assert_eq!(Error::NoResponse.reply_code(), None);
    }
}
