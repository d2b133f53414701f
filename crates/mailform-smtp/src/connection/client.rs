//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::framing::{BODY_PLACEHOLDER, frame_data};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::transcript::Transcript;
use crate::types::{Address, Reply, ReplyCode};
use base64::Engine;
use std::marker::PhantomData;

/// Type-state marker for connected state.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Connected {}
    impl Sealed for super::Authenticated {}
}

/// States from which a mail transaction may start.
pub trait Ready: sealed::Sealed {}
impl Ready for Connected {}
impl Ready for Authenticated {}

/// SMTP client with type-state pattern.
///
/// Every line sent or received is appended to the borrowed [`Transcript`].
/// Dropping the client closes the connection.
#[derive(Debug)]
pub struct Client<'t, State> {
    stream: SmtpStream,
    transcript: &'t mut Transcript,
    server_info: ServerInfo,
    client_hostname: Option<String>,
    _state: PhantomData<State>,
}

impl<'t> Client<'t, Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or the code is not 220.
    pub async fn from_stream(mut stream: SmtpStream, transcript: &'t mut Transcript) -> Result<Self> {
        let greeting = read_reply(&mut stream, transcript).await?;
        expect("greeting", &greeting, &[ReplyCode::SERVICE_READY])?;

        // Hostname is the first word after the code
        let hostname = greeting
            .first_line()
            .split_whitespace()
            .next()
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            stream,
            transcript,
            server_info: ServerInfo {
                hostname,
                extensions: Vec::new(),
            },
            client_hostname: None,
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records server capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command is not answered with 250.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        self.client_hostname = Some(client_hostname.to_string());
        self.send_ehlo(client_hostname).await?;
        Ok(self)
    }

    /// Upgrades the connection to TLS using STARTTLS, then repeats EHLO.
    ///
    /// `hostname` is the server name the certificate is checked against.
    ///
    /// # Errors
    ///
    /// Returns an error if EHLO has not been sent yet, the server refuses
    /// STARTTLS, the handshake fails, or the second EHLO is refused.
    pub async fn starttls(mut self, hostname: &str) -> Result<Self> {
        let Some(client_hostname) = self.client_hostname.clone() else {
            return Err(Error::InvalidState("STARTTLS before EHLO".into()));
        };

        let reply = self.send_command(&Command::StartTls).await?;
        expect("STARTTLS", &reply, &[ReplyCode::SERVICE_READY])?;

        self.stream = self.stream.upgrade_to_tls(hostname).await?;
        tracing::debug!("TLS established with {}", hostname);

        // Capabilities must be negotiated again over the encrypted channel
        self.send_ehlo(&client_hostname).await?;
        Ok(self)
    }

    /// Authenticates using the LOGIN mechanism.
    ///
    /// Credential lines are recorded in the transcript as redacted.
    ///
    /// # Errors
    ///
    /// Returns an error if any step of the exchange gets an unexpected reply.
    pub async fn auth_login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<'t, Authenticated>> {
        let engine = base64::engine::general_purpose::STANDARD;

        let reply = self.send_command(&Command::AuthLogin).await?;
        expect("AUTH LOGIN", &reply, &[ReplyCode::AUTH_CONTINUE])?;

        let reply = self
            .send_command(&Command::AuthResponse(engine.encode(username)))
            .await?;
        expect("AUTH LOGIN username", &reply, &[ReplyCode::AUTH_CONTINUE])?;

        let reply = self
            .send_command(&Command::AuthResponse(engine.encode(password)))
            .await?;
        expect("AUTH LOGIN password", &reply, &[ReplyCode::AUTH_SUCCEEDED])?;

        Ok(self.into_state())
    }

    async fn send_ehlo(&mut self, client_hostname: &str) -> Result<()> {
        let cmd = Command::Ehlo {
            hostname: client_hostname.to_string(),
        };
        let reply = self.send_command(&cmd).await?;
        expect("EHLO", &reply, &[ReplyCode::OK])?;

        // First line is the server's greeting, the rest are capabilities
        self.server_info.set_extensions(reply.lines.iter().skip(1));
        Ok(())
    }
}

impl<'t, S: Ready> Client<'t, S> {
    /// Starts a mail transaction with the envelope sender.
    ///
    /// # Errors
    ///
    /// Returns an error if MAIL FROM is not answered with 250.
    pub async fn mail_from(mut self, from: &Address) -> Result<Client<'t, MailTransaction>> {
        let cmd = Command::MailFrom { from: from.clone() };
        let reply = self.send_command(&cmd).await?;
        expect(cmd.name(), &reply, &[ReplyCode::OK])?;
        Ok(self.into_state())
    }
}

impl<'t> Client<'t, MailTransaction> {
    /// Adds the first recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if RCPT TO is not answered with 250 or 251.
    pub async fn rcpt_to(mut self, to: &Address) -> Result<Client<'t, RecipientAdded>> {
        self.send_rcpt(to).await?;
        Ok(self.into_state())
    }
}

impl<'t> Client<'t, RecipientAdded> {
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if RCPT TO is not answered with 250 or 251.
    pub async fn rcpt_to(mut self, to: &Address) -> Result<Self> {
        self.send_rcpt(to).await?;
        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if DATA is not answered with 354.
    pub async fn data(mut self) -> Result<Client<'t, Data>> {
        let reply = self.send_command(&Command::Data).await?;
        expect("DATA", &reply, &[ReplyCode::START_DATA])?;
        Ok(self.into_state())
    }
}

impl<'t> Client<'t, Data> {
    /// Sends the message content and completes the transaction.
    ///
    /// `message` is the RFC 5322 text (headers, blank line, body). Line
    /// endings are normalized to CRLF, leading dots are doubled and the
    /// terminating `.` line is appended. The transcript only records a
    /// placeholder for the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails or the server does not answer 250.
    pub async fn send_message(mut self, message: &str) -> Result<Client<'t, Connected>> {
        let payload = frame_data(message);
        self.transcript.outgoing(BODY_PLACEHOLDER);
        self.stream.write_all(&payload).await?;

        let reply = read_reply(&mut self.stream, self.transcript).await?;
        expect("end of DATA", &reply, &[ReplyCode::OK])?;

        Ok(self.into_state())
    }
}

// Common implementation for all states
impl<'t, S> Client<'t, S> {
    /// Returns the server information.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Returns true if the session runs over TLS.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        self.stream.is_tls()
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// The reply code is not checked; the connection is closed either way.
    ///
    /// # Errors
    ///
    /// Returns an error only if writing QUIT or reading the reply fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(&Command::Quit).await?;
        if reply.code != ReplyCode::CLOSING {
            tracing::debug!("QUIT answered with {}", reply.code);
        }
        Ok(())
    }

    async fn send_rcpt(&mut self, to: &Address) -> Result<()> {
        let cmd = Command::RcptTo { to: to.clone() };
        let reply = self.send_command(&cmd).await?;
        expect(cmd.name(), &reply, &[ReplyCode::OK, ReplyCode::FORWARD])
    }

    async fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        self.transcript.outgoing(cmd.transcript_line());
        self.stream.write_all(&cmd.serialize()).await?;
        read_reply(&mut self.stream, self.transcript).await
    }

    fn into_state<T>(self) -> Client<'t, T> {
        Client {
            stream: self.stream,
            transcript: self.transcript,
            server_info: self.server_info,
            client_hostname: self.client_hostname,
            _state: PhantomData,
        }
    }
}

/// Most lines accepted in one reply.
const MAX_REPLY_LINES: usize = 512;

/// Reads one complete reply. The whole reply shares the stream's timeout,
/// so a peer trickling continuation lines cannot hold the session open.
async fn read_reply(stream: &mut SmtpStream, transcript: &mut Transcript) -> Result<Reply> {
    let limit = stream.io_timeout();
    tokio::time::timeout(limit, read_reply_lines(stream, transcript))
        .await
        .map_err(|_| Error::Timeout("reading reply"))?
}

async fn read_reply_lines(stream: &mut SmtpStream, transcript: &mut Transcript) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        if line.is_empty() {
            continue;
        }
        if lines.len() == MAX_REPLY_LINES {
            return Err(Error::Protocol(format!("Reply exceeds {MAX_REPLY_LINES} lines")));
        }
        transcript.incoming(line.clone());

        let is_last = is_last_reply_line(&line);
        lines.push(line);

        if is_last {
            break;
        }
    }

    parse_reply(&lines)
}

fn expect(command: &'static str, reply: &Reply, accepted: &[ReplyCode]) -> Result<()> {
    if reply.is_one_of(accepted) {
        Ok(())
    } else {
        Err(Error::unexpected_reply(
            command,
            reply.code.as_u16(),
            reply.text(),
        ))
    }
}
