//! Outbound message model and header rendering.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Value of the client-identification header.
pub const MAILER: &str = concat!("mailform/", env!("CARGO_PKG_VERSION"));

/// One outbound email, built from pre-validated form input.
///
/// Name and addresses have CR and LF removed so they cannot inject
/// headers. Subject and body are kept as given; each transport frames
/// them safely for its own wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    sender_name: String,
    sender_address: String,
    recipient_address: String,
    subject: String,
    body: String,
}

impl Message {
    /// Creates a message. Never fails; address syntax is checked by the caller.
    #[must_use]
    pub fn new(
        sender_name: &str,
        sender_address: &str,
        recipient_address: &str,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            sender_name: strip_line_breaks(sender_name),
            sender_address: strip_line_breaks(sender_address),
            recipient_address: strip_line_breaks(recipient_address),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Display name of the person filling in the form.
    #[must_use]
    pub fn sender_name(&self) -> &str {
        &self.sender_name
    }

    /// Address replies should go to.
    #[must_use]
    pub fn sender_address(&self) -> &str {
        &self.sender_address
    }

    /// Recipient address.
    #[must_use]
    pub fn recipient_address(&self) -> &str {
        &self.recipient_address
    }

    /// Subject as entered.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Body as entered.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Reply-To value in plain `name <address>` form.
    #[must_use]
    pub fn reply_to(&self) -> String {
        format!("{} <{}>", self.sender_name, self.sender_address)
    }
}

fn strip_line_breaks(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, '\r' | '\n')).collect()
}

/// Encodes a header value as an RFC 2047 `B` encoded-word when it cannot
/// go on the wire as-is (non-ASCII, control characters, or a literal `=?`).
#[must_use]
pub fn encode_header_value(text: &str) -> String {
    let plain = text.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) && !text.contains("=?");
    if plain {
        return text.to_string();
    }
    format!("=?UTF-8?B?{}?=", STANDARD.encode(text.as_bytes()))
}

/// Formats a mailbox (`Name <address>`) for a header.
///
/// Names with RFC 5322 specials are quoted; non-ASCII names are encoded.
#[must_use]
pub fn format_mailbox(name: &str, address: &str) -> String {
    if name.is_empty() {
        return format!("<{address}>");
    }
    if !name.is_ascii() || name.chars().any(|c| c.is_ascii_control()) {
        return format!("{} <{address}>", encode_header_value(name));
    }
    if name.chars().any(|c| "()<>[]:;@\\,.\"".contains(c)) {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        return format!("\"{escaped}\" <{address}>");
    }
    format!("{name} <{address}>")
}

/// Ordered header block followed by a body.
#[derive(Debug, Default)]
pub(crate) struct HeaderBlock {
    headers: Vec<(&'static str, String)>,
}

impl HeaderBlock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: &'static str, value: impl Into<String>) -> &mut Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Renders headers, a blank line and `body`, using `eol` between lines.
    pub(crate) fn render(&self, body: &str, eol: &str) -> String {
        let mut out = String::with_capacity(body.len() + 64 * self.headers.len());
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str(eol);
        }
        out.push_str(eol);
        out.push_str(body);
        out
    }
}
