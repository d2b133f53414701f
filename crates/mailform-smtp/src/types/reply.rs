//! Server replies.

use std::fmt;

/// First digit of a reply code (RFC 5321 §4.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyClass {
    /// `2yz`: the command succeeded.
    Completion,
    /// `3yz`: the server waits for more input (AUTH, DATA).
    Intermediate,
    /// `4yz`: failure that may clear up later.
    Transient,
    /// `5yz`: failure that will not clear up by retrying.
    Permanent,
    /// Any other leading digit.
    Unknown,
}

/// Three-digit reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220, greeting and STARTTLS go-ahead.
    pub const SERVICE_READY: Self = Self(220);
    /// 221, answer to QUIT.
    pub const CLOSING: Self = Self(221);
    /// 235, AUTH accepted.
    pub const AUTH_SUCCEEDED: Self = Self(235);
    /// 250, requested action completed.
    pub const OK: Self = Self(250);
    /// 251, recipient not local, will forward.
    pub const FORWARD: Self = Self(251);
    /// 334, AUTH challenge.
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354, send the message data.
    pub const START_DATA: Self = Self(354);

    /// Wraps a numeric code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Numeric value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Classifies the code by its first digit.
    #[must_use]
    pub const fn class(self) -> ReplyClass {
        match self.0 / 100 {
            2 => ReplyClass::Completion,
            3 => ReplyClass::Intermediate,
            4 => ReplyClass::Transient,
            5 => ReplyClass::Permanent,
            _ => ReplyClass::Unknown,
        }
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// A complete, possibly multi-line, reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Code of the final line.
    pub code: ReplyCode,
    /// Text of each line with the code and separator removed.
    pub lines: Vec<String>,
}

impl Reply {
    /// Builds a reply from its code and line texts.
    #[must_use]
    pub const fn new(code: ReplyCode, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// Returns true if the code is in `accepted`.
    #[must_use]
    pub fn is_one_of(&self, accepted: &[ReplyCode]) -> bool {
        accepted.contains(&self.code)
    }

    /// Text of the first line, or `""`.
    #[must_use]
    pub fn first_line(&self) -> &str {
        self.lines.first().map_or("", String::as_str)
    }

    /// All line texts joined by newlines.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_follows_first_digit() {
        assert_eq!(ReplyCode::OK.class(), ReplyClass::Completion);
        assert_eq!(ReplyCode::FORWARD.class(), ReplyClass::Completion);
        assert_eq!(ReplyCode::START_DATA.class(), ReplyClass::Intermediate);
        assert_eq!(ReplyCode::new(421).class(), ReplyClass::Transient);
        assert_eq!(ReplyCode::new(535).class(), ReplyClass::Permanent);
        assert_eq!(ReplyCode::new(999).class(), ReplyClass::Unknown);
    }

    #[test]
    fn codes_render_as_three_digits() {
        assert_eq!(ReplyCode::OK.to_string(), "250");
        assert_eq!(ReplyCode::new(0).to_string(), "000");
    }

    #[test]
    fn accepted_codes() {
        let reply = Reply::new(ReplyCode::FORWARD, vec!["forwarding".to_string()]);
        assert!(reply.is_one_of(&[ReplyCode::OK, ReplyCode::FORWARD]));
        assert!(!reply.is_one_of(&[ReplyCode::OK]));
    }

    #[test]
    fn text_of_multi_line_reply() {
        let reply = Reply::new(
            ReplyCode::OK,
            vec!["mx.example.com".to_string(), "PIPELINING".to_string()],
        );
        assert_eq!(reply.first_line(), "mx.example.com");
        assert_eq!(reply.text(), "mx.example.com\nPIPELINING");
        assert_eq!(Reply::new(ReplyCode::OK, Vec::new()).first_line(), "");
    }
}
