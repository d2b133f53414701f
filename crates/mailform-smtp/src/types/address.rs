//! Envelope addresses.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Address used in `MAIL FROM:<...>` and `RCPT TO:<...>`.
///
/// Only the shape needed to keep the command line intact is enforced:
/// exactly one `@` with text on both sides, and nothing that could close
/// the angle brackets or start a new line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Checks `addr` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] naming the problem.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        match problem(&addr) {
            Some(reason) => Err(Error::InvalidAddress(format!("{addr:?}: {reason}"))),
            None => Ok(Self(addr)),
        }
    }

    /// The address text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn problem(addr: &str) -> Option<&'static str> {
    if addr
        .chars()
        .any(|c| c.is_control() || c.is_whitespace() || matches!(c, '<' | '>'))
    {
        return Some("contains whitespace, control characters or angle brackets");
    }
    match addr.split('@').collect::<Vec<_>>().as_slice() {
        [local, domain] if !local.is_empty() && !domain.is_empty() => None,
        [_, _] => Some("empty local part or domain"),
        [_] => Some("missing @"),
        _ => Some("more than one @"),
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
