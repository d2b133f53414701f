//! # mailform-core
//!
//! Delivery of contact-form messages.
//!
//! This crate provides:
//! - **Configuration** read once from the process environment
//! - **Message composition** with RFC 2047 header encoding
//! - **Transports**: the local `sendmail` agent, direct SMTP and an HTTPS
//!   email API, selected per delivery attempt
//! - **Diagnostics**: every failure carries an operator-facing explanation,
//!   including the SMTP transcript where there is one
//!
//! ## Example
//!
//! ```ignore
//! use mailform_core::{Message, Transport, TransportConfig};
//!
//! let config = TransportConfig::from_env()?;
//! let message = Message::new("Alice", "alice@x.com", "bob@y.com", "Hello", "Hi");
//! let result = Transport::from_config(&config).deliver(&message).await;
//! assert!(result.is_sent());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod message;
pub mod transport;

pub use config::{
    Encryption, HttpApiConfig, LocalAgentConfig, Sender, SmtpConfig, TransportConfig,
    TransportKind,
};
pub use error::{ConfigError, DeliveryError};
pub use message::Message;
pub use transport::{
    DeliveryResult, HttpApiTransport, LocalAgentTransport, SmtpTransport, Transport,
};
