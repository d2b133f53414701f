//! Hand-off to the host's `sendmail`-compatible submission agent.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::{LocalAgentConfig, Sender};
use crate::error::DeliveryError;
use crate::message::{HeaderBlock, MAILER, Message, encode_header_value, format_mailbox};

/// Submits messages through the local mail agent.
///
/// Success only means the agent accepted the message for queuing.
#[derive(Debug, Clone)]
pub struct LocalAgentTransport {
    config: LocalAgentConfig,
    sender: Sender,
    timeout: Duration,
}

impl LocalAgentTransport {
    /// Creates a transport bound to the given agent settings.
    #[must_use]
    pub const fn new(config: LocalAgentConfig, sender: Sender, timeout: Duration) -> Self {
        Self {
            config,
            sender,
            timeout,
        }
    }

    /// Configured agent command line.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.config.command
    }

    /// Pipes `message` into the agent and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Submission`] if the agent cannot be started,
    /// times out or exits unsuccessfully.
    pub async fn send(&self, message: &Message) -> Result<(), DeliveryError> {
        let mut parts = self.config.command.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(DeliveryError::ConfigurationMissing(
                "sendmail command is empty (SENDMAIL_PATH)".into(),
            ));
        };

        let mut child = Command::new(program)
            .args(parts)
            .arg("-f")
            .arg(&self.sender.envelope_from)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.failure(&format!("cannot start agent: {e}")))?;

        let text = self.compose(message);
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(text.as_bytes()).await?;
                // Closing stdin ends the message
                drop(stdin);
            }
            Ok::<_, std::io::Error>(())
        };

        // stderr is drained while the message is written, and the whole run
        // shares one deadline. Dropping the child on timeout kills it.
        let run = async { tokio::join!(feed, child.wait_with_output()) };
        let (fed, output) = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| self.failure("agent did not exit in time"))?;
        let output = output.map_err(|e| self.failure(&format!("waiting for agent failed: {e}")))?;

        if let Err(e) = &fed
            && output.status.success()
        {
            return Err(self.failure(&format!("writing message to agent failed: {e}")));
        }

        if output.status.success() {
            tracing::info!("Local agent accepted message for {}", message.recipient_address());
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let reason = if stderr.is_empty() {
            format!("agent exited with {}", output.status)
        } else {
            format!("agent exited with {}: {stderr}", output.status)
        };
        Err(self.failure(&reason))
    }

    /// Renders the message handed to the agent (LF line endings).
    #[must_use]
    pub fn compose(&self, message: &Message) -> String {
        let mut headers = HeaderBlock::new();
        headers
            .push("To", message.recipient_address())
            .push("Subject", encode_header_value(message.subject()))
            .push("MIME-Version", "1.0")
            .push("Content-Type", "text/plain; charset=UTF-8")
            .push(
                "From",
                format_mailbox(&self.sender.name, &self.sender.address),
            )
            .push(
                "Reply-To",
                format_mailbox(message.sender_name(), message.sender_address()),
            )
            .push("X-Mailer", MAILER);
        headers.render(&mailform_smtp::framing::normalize_line_endings(message.body()), "\n")
    }

    fn failure(&self, reason: &str) -> DeliveryError {
        let relay = match (&self.config.relay_host, self.config.relay_port) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.clone(),
            (None, Some(port)) => format!("<unset>:{port}"),
            (None, None) => "<unset>".to_string(),
        };
        tracing::warn!("Local agent submission failed: {}", reason);
        DeliveryError::Submission(format!(
            "{reason} (sendmail command: {}, relay: {relay})",
            self.config.command
        ))
    }
}
