//! `mailform` - send one contact-form message from the command line.
//!
//! The visitor-facing outcome goes to stdout. Failure diagnostics are for
//! the operator and go to stderr through the log.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod form;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use form::Form;
use mailform_core::{DeliveryResult, Transport, TransportConfig};

/// Shown after the transport accepted the message.
const SENT: &str = "Message sent successfully.";
/// Shown for every delivery failure; details stay in the log.
const NOT_SENT: &str = "Message could not be sent by the server.";

/// Command-line arguments / environment variables
#[derive(Debug, Parser)]
#[command(name = "mailform", version, about)]
struct Args {
    /// Name of the person sending the message
    #[arg(long, env = "MAIL_SENDER_NAME", default_value = "")]
    sender_name: String,

    /// Address replies should go to
    #[arg(long, env = "MAIL_SENDER_EMAIL", default_value = "")]
    sender_email: String,

    /// Recipient address
    #[arg(long, env = "MAIL_RECIPIENT", default_value = "")]
    recipient: String,

    /// Subject line
    #[arg(long, env = "MAIL_SUBJECT", default_value = "")]
    subject: String,

    /// Message body
    #[arg(long, env = "MAIL_MESSAGE", conflicts_with = "message_file")]
    message: Option<String>,

    /// Read the message body from a file (`-` for stdin)
    #[arg(long)]
    message_file: Option<PathBuf>,
}

impl Args {
    fn into_form(self) -> Result<Form> {
        let message = match (self.message, self.message_file) {
            (Some(text), _) => text,
            (None, Some(path)) => read_message(&path)?,
            (None, None) => String::new(),
        };
        Ok(Form {
            sender_name: self.sender_name,
            sender_email: self.sender_email,
            recipient: self.recipient,
            subject: self.subject,
            message,
        })
    }
}

fn read_message(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read message from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read message file {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env before the filter reads RUST_LOG
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailform=info,mailform_core=info,mailform_smtp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match dotenv {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => error!("Failed to load .env: {}", e),
    }

    let form = Args::parse().into_form()?;
    let config = TransportConfig::from_env().context("Invalid mail configuration")?;

    let message = match form.validate() {
        Ok(message) => message,
        Err(e) => {
            info!("Form rejected: {}", e);
            println!("{}", e.user_message());
            return Ok(ExitCode::FAILURE);
        }
    };

    let transport = Transport::from_config(&config);
    info!("Delivering via {}", transport.kind());

    match transport.deliver(&message).await {
        DeliveryResult::Sent => {
            println!("{SENT}");
            Ok(ExitCode::SUCCESS)
        }
        DeliveryResult::Failed { diagnostic } => {
            error!("{}", diagnostic);
            println!("{NOT_SENT}");
            Ok(ExitCode::FAILURE)
        }
    }
}
