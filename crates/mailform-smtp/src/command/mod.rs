//! Commands the client sends.

use std::fmt;

use crate::types::Address;

/// Placeholder recorded in transcripts instead of AUTH credential lines.
pub const REDACTED_CREDENTIALS: &str = "<credentials redacted>";

/// One command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `EHLO <hostname>`
    Ehlo {
        /// Name the client introduces itself with.
        hostname: String,
    },
    /// `STARTTLS`
    StartTls,
    /// `AUTH LOGIN`
    AuthLogin,
    /// Base64 line answering a 334 challenge.
    AuthResponse(String),
    /// `MAIL FROM:<address>`
    MailFrom {
        /// Envelope sender.
        from: Address,
    },
    /// `RCPT TO:<address>`
    RcptTo {
        /// Envelope recipient.
        to: Address,
    },
    /// `DATA`
    Data,
    /// `QUIT`
    Quit,
}

impl Command {
    /// Keyword used to name the command in errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ehlo { .. } => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::AuthLogin | Self::AuthResponse(_) => "AUTH LOGIN",
            Self::MailFrom { .. } => "MAIL FROM",
            Self::RcptTo { .. } => "RCPT TO",
            Self::Data => "DATA",
            Self::Quit => "QUIT",
        }
    }

    /// Wire form: the command line followed by CRLF.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        format!("{self}\r\n").into_bytes()
    }

    /// Line recorded in a transcript. Credential lines are redacted.
    #[must_use]
    pub fn transcript_line(&self) -> String {
        match self {
            Self::AuthResponse(_) => REDACTED_CREDENTIALS.to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ehlo { hostname } => write!(f, "EHLO {hostname}"),
            Self::AuthResponse(encoded) => f.write_str(encoded),
            Self::MailFrom { from } => write!(f, "MAIL FROM:<{from}>"),
            Self::RcptTo { to } => write!(f, "RCPT TO:<{to}>"),
            Self::StartTls | Self::AuthLogin | Self::Data | Self::Quit => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn simple_commands_are_their_keyword() {
        for (cmd, wire) in [
            (Command::StartTls, &b"STARTTLS\r\n"[..]),
            (Command::AuthLogin, b"AUTH LOGIN\r\n"),
            (Command::Data, b"DATA\r\n"),
            (Command::Quit, b"QUIT\r\n"),
        ] {
            assert_eq!(cmd.serialize(), wire);
        }
    }

    #[test]
    fn ehlo_carries_hostname() {
        let cmd = Command::Ehlo {
            hostname: "client.example.com".to_string(),
        };
        assert_eq!(cmd.serialize(), b"EHLO client.example.com\r\n");
        assert_eq!(cmd.name(), "EHLO");
    }

    #[test]
    fn envelope_commands_bracket_the_address() {
        let from = Command::MailFrom {
            from: Address::new("sender@example.com").unwrap(),
        };
        assert_eq!(from.serialize(), b"MAIL FROM:<sender@example.com>\r\n");
        assert_eq!(from.transcript_line(), "MAIL FROM:<sender@example.com>");

        let to = Command::RcptTo {
            to: Address::new("recipient@example.com").unwrap(),
        };
        assert_eq!(to.serialize(), b"RCPT TO:<recipient@example.com>\r\n");
    }

    #[test]
    fn credentials_never_reach_the_transcript() {
        let cmd = Command::AuthResponse("c2VjcmV0".to_string());
        assert_eq!(cmd.serialize(), b"c2VjcmV0\r\n");
        assert_eq!(cmd.transcript_line(), REDACTED_CREDENTIALS);
        assert_eq!(Command::AuthLogin.transcript_line(), "AUTH LOGIN");
    }
}
