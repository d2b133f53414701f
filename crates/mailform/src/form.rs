//! Contact form fields and their validation.

use mailform_core::Message;
use thiserror::Error;

/// Shown when validation fails because a field is blank.
pub const MISSING_FIELDS: &str = "Please fill out all fields.";
/// Shown when an address does not look like an email address.
pub const INVALID_ADDRESSES: &str = "Please provide valid email addresses.";

/// Why the submitted fields were refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A field is empty after trimming.
    #[error("{MISSING_FIELDS} ({0} is empty)")]
    Missing(&'static str),
    /// An address field is malformed.
    #[error("{INVALID_ADDRESSES} ({0} is invalid)")]
    InvalidAddress(&'static str),
}

impl ValidationError {
    /// Message for the person filling in the form.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Missing(_) => MISSING_FIELDS,
            Self::InvalidAddress(_) => INVALID_ADDRESSES,
        }
    }
}

/// Raw form input.
#[derive(Debug, Clone, Default)]
pub struct Form {
    /// Visitor's name.
    pub sender_name: String,
    /// Visitor's address, used for `Reply-To`.
    pub sender_email: String,
    /// Where the message goes.
    pub recipient: String,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub message: String,
}

impl Form {
    /// Trims every field and checks it, producing the message to deliver.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: blank fields are reported before
    /// malformed addresses.
    pub fn validate(&self) -> Result<Message, ValidationError> {
        let fields = [
            ("sender name", self.sender_name.trim()),
            ("sender email", self.sender_email.trim()),
            ("recipient", self.recipient.trim()),
            ("subject", self.subject.trim()),
            ("message", self.message.trim()),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| value.is_empty()) {
            return Err(ValidationError::Missing(*name));
        }

        let [
            (_, sender_name),
            (_, sender_email),
            (_, recipient),
            (_, subject),
            (_, message),
        ] = fields;

        if !is_valid_email(sender_email) {
            return Err(ValidationError::InvalidAddress("sender email"));
        }
        if !is_valid_email(recipient) {
            return Err(ValidationError::InvalidAddress("recipient"));
        }

        Ok(Message::new(
            sender_name,
            sender_email,
            recipient,
            subject,
            message,
        ))
    }
}

/// Conservative `local@domain.tld` check.
#[must_use]
pub fn is_valid_email(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local.len() <= 64
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(c));

    let labels: Vec<&str> = domain.split('.').collect();
    let domain_ok = labels.len() >= 2
        && domain.len() <= 253
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });

    local_ok && domain_ok
}
