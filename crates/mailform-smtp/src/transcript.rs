//! Append-only record of one SMTP session.
//!
//! A [`Transcript`] is owned by whoever drives a delivery attempt and lent to
//! the [`Client`](crate::Client) for the duration of the session, so it is
//! still readable after the client (and its socket) has been dropped on an
//! error path.

use std::fmt;

/// Which side of the connection produced a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent by the client.
    Outgoing,
    /// Received from the server.
    Incoming,
}

impl Direction {
    const fn marker(self) -> &'static str {
        match self {
            Self::Outgoing => ">",
            Self::Incoming => "<",
        }
    }
}

/// One transcript line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    /// Direction of the line.
    pub direction: Direction,
    /// Line content without the trailing CRLF.
    pub line: String,
}

/// Session transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a line sent by the client.
    pub fn outgoing(&mut self, line: impl Into<String>) {
        self.push(Direction::Outgoing, line.into());
    }

    /// Records a line received from the server.
    pub fn incoming(&mut self, line: impl Into<String>) {
        self.push(Direction::Incoming, line.into());
    }

    fn push(&mut self, direction: Direction, line: String) {
        tracing::debug!("SMTP {} {}", direction.marker(), line);
        self.entries.push(TranscriptEntry { direction, line });
    }

    /// Returns the recorded entries in order.
    #[must_use]
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of recorded lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{} {}", entry.direction.marker(), entry.line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_in_order_with_markers() {
        let mut transcript = Transcript::new();
        assert!(transcript.is_empty());

        transcript.incoming("220 mx.example.com ESMTP");
        transcript.outgoing("EHLO localhost");
        transcript.incoming("250 mx.example.com");

        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.entries()[1].direction, Direction::Outgoing);
        assert_eq!(
            transcript.to_string(),
            "< 220 mx.example.com ESMTP\n> EHLO localhost\n< 250 mx.example.com"
        );
    }
}
