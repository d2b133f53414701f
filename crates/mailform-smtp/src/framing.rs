//! DATA payload framing (RFC 5321 §4.5.2).
//!
//! The payload handed to the server after `354` is the message with every
//! line terminated by CRLF, lines starting with `.` doubled, and a final
//! `.` line.

/// Placeholder recorded in transcripts instead of the DATA payload.
pub const BODY_PLACEHOLDER: &str = "<message body omitted>";

/// End-of-data marker.
pub const TERMINATOR: &[u8] = b".\r\n";

/// Converts `\r\n` and lone `\r` line breaks to `\n`.
#[must_use]
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Doubles a leading period so the line cannot be read as the terminator.
#[must_use]
pub fn dot_stuff(line: &str) -> std::borrow::Cow<'_, str> {
    if line.starts_with('.') {
        std::borrow::Cow::Owned(format!(".{line}"))
    } else {
        std::borrow::Cow::Borrowed(line)
    }
}

/// Builds the complete DATA payload for `message`, terminator included.
///
/// A trailing line break in `message` does not produce an extra empty line.
#[must_use]
pub fn frame_data(message: &str) -> Vec<u8> {
    let normalized = normalize_line_endings(message);
    let mut payload = Vec::with_capacity(normalized.len() + normalized.len() / 32 + 8);

    for line in normalized.lines() {
        payload.extend_from_slice(dot_stuff(line).as_bytes());
        payload.extend_from_slice(b"\r\n");
    }

    payload.extend_from_slice(TERMINATOR);
    payload
}
