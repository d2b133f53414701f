//! # mailform-smtp
//!
//! A small SMTP client that delivers one message per session.
//!
//! ## Features
//!
//! - **Type-state connection management**: the greeting, EHLO, STARTTLS,
//!   AUTH, envelope and DATA steps can only be called in protocol order
//! - **TLS support**: both implicit TLS (port 465) and STARTTLS
//! - **Authentication**: AUTH LOGIN
//! - **Transcripts**: every command and reply is appended to a [`Transcript`]
//!   lent to the client, with credentials and message bodies redacted
//! - **Timeouts**: connect, every read and every write are bounded
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use mailform_smtp::{Address, Client, Transcript};
//! use mailform_smtp::connection::connect;
//!
//! #[tokio::main]
//! async fn main() -> mailform_smtp::Result<()> {
//!     let mut transcript = Transcript::new();
//!     let stream = connect("smtp.example.com", 587, Duration::from_secs(15)).await?;
//!     let client = Client::from_stream(stream, &mut transcript).await?;
//!
//!     let client = client.ehlo("client.example.com").await?;
//!     let client = client.starttls("smtp.example.com").await?;
//!     let client = client.auth_login("user@example.com", "password").await?;
//!
//!     let client = client.mail_from(&Address::new("sender@example.com")?).await?;
//!     let client = client.rcpt_to(&Address::new("recipient@example.com")?).await?;
//!     let client = client.data().await?;
//!
//!     let client = client.send_message("Subject: Test\r\n\r\nHello, World!\r\n").await?;
//!     client.quit().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌──────────────┐
//! │  Connected   │ ─── auth_login() ───→ Authenticated
//! └──────────────┘                              │
//!        │                                      │
//!        └─── mail_from() ───→ MailTransaction ←┘
//!                                   │
//!                    rcpt_to() ───→ RecipientAdded ─── data() ───→ Data
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: Streams and the type-state client
//! - [`framing`]: DATA payload framing (CRLF normalization, dot-stuffing)
//! - [`parser`]: Reply parser
//! - [`transcript`]: Session transcripts
//! - [`types`]: Addresses and replies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod framing;
pub mod parser;
pub mod transcript;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, Ready, ServerInfo,
    SmtpStream,
};
pub use error::{Error, Result};
pub use transcript::{Direction, Transcript, TranscriptEntry};
pub use types::{Address, Reply, ReplyClass, ReplyCode};
