//! Integration tests for the SMTP client.
//!
//! These tests run the client against a scripted server on a loopback
//! socket. The server plays back replies, records what the client sends,
//! and reports whether the client closed the connection at the end.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

use mailform_smtp::connection::{connect, connect_tls_with, connect_with};
use mailform_smtp::{Address, Client, Direction, Error, Transcript};

/// One step of the server script.
enum Step {
    /// Write a raw reply (may contain several lines).
    Reply(&'static str),
    /// Read one command line.
    Command,
    /// Read a DATA payload up to and including the terminator.
    Payload,
    /// Run the server side of a TLS handshake on the connection.
    AcceptTls(TlsAcceptor),
    /// Close the connection from the server side.
    Hangup,
}

trait Io: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Io for T {}

struct ServerLog {
    commands: Vec<String>,
    payload: String,
    closed_by_client: bool,
}

async fn scripted_server(script: Vec<Step>) -> (u16, JoinHandle<ServerLog>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut reader: BufReader<Box<dyn Io>> = BufReader::new(Box::new(socket));
        let mut log = ServerLog {
            commands: Vec::new(),
            payload: String::new(),
            closed_by_client: false,
        };

        for step in script {
            match step {
                Step::Reply(text) => {
                    let socket = reader.get_mut();
                    socket.write_all(text.as_bytes()).await.unwrap();
                    socket.flush().await.unwrap();
                }
                Step::Command => {
                    let mut line = String::new();
                    reader.read_line(&mut line).await.unwrap();
                    log.commands.push(line.trim_end().to_string());
                }
                Step::Payload => loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).await.unwrap() == 0 {
                        break;
                    }
                    log.payload.push_str(&line);
                    if line == ".\r\n" {
                        break;
                    }
                },
                Step::AcceptTls(acceptor) => {
                    let tls = acceptor.accept(reader.into_inner()).await.unwrap();
                    reader = BufReader::new(Box::new(tls));
                }
                Step::Hangup => return log,
            }
        }

        let mut rest = String::new();
        log.closed_by_client = match reader.read_line(&mut rest).await {
            Ok(0) => true,
            // TLS clients may drop the socket without close_notify
            Err(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
            Ok(_) => false,
        };
        log
    });

    (port, handle)
}

/// Self-signed certificate for `localhost`: the server side, and a client
/// configuration that trusts it.
fn localhost_tls() -> (TlsAcceptor, Arc<ClientConfig>) {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

    let server = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![cert.der().clone()], key)
        .unwrap();

    let mut roots = RootCertStore::empty();
    roots.add(cert.der().clone()).unwrap();
    let client = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    (TlsAcceptor::from(Arc::new(server)), Arc::new(client))
}

fn happy_path_script() -> Vec<Step> {
    vec![
        Step::Reply("220 mx.test ESMTP ready\r\n"),
        Step::Command, // EHLO
        Step::Reply("250-mx.test greets you\r\n250-AUTH LOGIN\r\n250 PIPELINING\r\n"),
        Step::Command, // AUTH LOGIN
        Step::Reply("334 VXNlcm5hbWU6\r\n"),
        Step::Command, // username
        Step::Reply("334 UGFzc3dvcmQ6\r\n"),
        Step::Command, // password
        Step::Reply("235 2.7.0 Authentication successful\r\n"),
        Step::Command, // MAIL FROM
        Step::Reply("250 2.1.0 Ok\r\n"),
        Step::Command, // RCPT TO
        Step::Reply("251 2.1.5 will forward\r\n"),
        Step::Command, // DATA
        Step::Reply("354 End data with <CR><LF>.<CR><LF>\r\n"),
        Step::Payload,
        Step::Reply("250 2.0.0 Ok: queued\r\n"),
        Step::Command, // QUIT
        Step::Reply("221 2.0.0 Bye\r\n"),
    ]
}

#[tokio::test]
async fn full_session_with_auth() {
    let (port, server) = scripted_server(happy_path_script()).await;
    let mut transcript = Transcript::new();

    let stream = connect("127.0.0.1", port, Duration::from_secs(5))
        .await
        .unwrap();
    let client = Client::from_stream(stream, &mut transcript).await.unwrap();
    assert_eq!(client.server_info().hostname, "mx.test");

    let client = client.ehlo("client.test").await.unwrap();
    assert!(client.server_info().supports("AUTH"));
    assert!(!client.is_tls());

    let client = client.auth_login("user", "secret").await.unwrap();
    let client = client
        .mail_from(&Address::new("no-reply@client.test").unwrap())
        .await
        .unwrap();
    let client = client
        .rcpt_to(&Address::new("bob@y.com").unwrap())
        .await
        .unwrap();
    let client = client.data().await.unwrap();
    let client = client
        .send_message("Subject: Hello\r\n\r\nHi\n.there\n")
        .await
        .unwrap();
    client.quit().await.unwrap();

    let log = server.await.unwrap();
    assert_eq!(
        log.commands,
        vec![
            "EHLO client.test",
            "AUTH LOGIN",
            "dXNlcg==",
            "c2VjcmV0",
            "MAIL FROM:<no-reply@client.test>",
            "RCPT TO:<bob@y.com>",
            "DATA",
            "QUIT",
        ]
    );
    assert_eq!(log.payload, "Subject: Hello\r\n\r\nHi\r\n..there\r\n.\r\n");
    assert!(log.closed_by_client);

    let rendered = transcript.to_string();
    assert!(rendered.contains("< 250-mx.test greets you"));
    assert!(rendered.contains("< 250 PIPELINING"));
    assert!(rendered.contains("> <message body omitted>"));
    assert!(!rendered.contains("there"));
    assert!(!rendered.contains("c2VjcmV0"));
    assert!(!rendered.contains("dXNlcg=="));
}

#[tokio::test]
async fn multi_line_reply_is_fully_recorded() {
    let (port, server) = scripted_server(vec![
        Step::Reply("220 mx.test\r\n"),
        Step::Command,
        Step::Reply("250-first\r\n250 second\r\n"),
    ])
    .await;
    let mut transcript = Transcript::new();

    let stream = connect("127.0.0.1", port, Duration::from_secs(5))
        .await
        .unwrap();
    let client = Client::from_stream(stream, &mut transcript).await.unwrap();
    let client = client.ehlo("client.test").await.unwrap();
    assert!(client.server_info().supports("SECOND"));
    drop(client);

    let incoming: Vec<&str> = transcript
        .entries()
        .iter()
        .filter(|e| e.direction == Direction::Incoming)
        .map(|e| e.line.as_str())
        .collect();
    assert_eq!(incoming, vec!["220 mx.test", "250-first", "250 second"]);
    assert!(server.await.unwrap().closed_by_client);
}

#[tokio::test]
async fn wrong_greeting_code_fails() {
    let (port, server) = scripted_server(vec![Step::Reply("554 go away\r\n")]).await;
    let mut transcript = Transcript::new();

    let stream = connect("127.0.0.1", port, Duration::from_secs(5))
        .await
        .unwrap();
    let err = Client::from_stream(stream, &mut transcript)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::UnexpectedReply {
            command: "greeting",
            code: 554,
            ..
        }
    ));
    assert!(err.is_permanent());
    assert_eq!(transcript.to_string(), "< 554 go away");
    assert!(server.await.unwrap().closed_by_client);
}

#[tokio::test]
async fn rejected_recipient_closes_connection() {
    let (port, server) = scripted_server(vec![
        Step::Reply("220 mx.test\r\n"),
        Step::Command,
        Step::Reply("250 mx.test\r\n"),
        Step::Command,
        Step::Reply("250 Ok\r\n"),
        Step::Command,
        Step::Reply("550 5.1.1 no such user\r\n"),
    ])
    .await;
    let mut transcript = Transcript::new();

    let result = async {
        let stream = connect("127.0.0.1", port, Duration::from_secs(5)).await?;
        let client = Client::from_stream(stream, &mut transcript).await?;
        let client = client.ehlo("client.test").await?;
        let client = client
            .mail_from(&Address::new("a@client.test")?)
            .await?;
        client.rcpt_to(&Address::new("nobody@y.com")?).await
    }
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.reply_code(), Some(550));
    assert!(transcript.to_string().ends_with("< 550 5.1.1 no such user"));
    assert!(server.await.unwrap().closed_by_client);
}

#[tokio::test]
async fn server_hangup_is_no_response() {
    let (port, server) = scripted_server(vec![
        Step::Reply("220 mx.test\r\n"),
        Step::Command,
        Step::Hangup,
    ])
    .await;
    let mut transcript = Transcript::new();

    let stream = connect("127.0.0.1", port, Duration::from_secs(5))
        .await
        .unwrap();
    let client = Client::from_stream(stream, &mut transcript).await.unwrap();

    // The scripted server hangs up after reading EHLO.
    let err = client.ehlo("client.test").await.unwrap_err();
    assert!(matches!(err, Error::NoResponse));
    server.await.unwrap();
}

#[tokio::test]
async fn starttls_requires_ehlo_first() {
    let (port, _server) = scripted_server(vec![Step::Reply("220 mx.test\r\n")]).await;
    let mut transcript = Transcript::new();

    let stream = connect("127.0.0.1", port, Duration::from_secs(5))
        .await
        .unwrap();
    let client = Client::from_stream(stream, &mut transcript).await.unwrap();
    let err = client.starttls("mx.test").await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn failed_tls_handshake_is_tls_error() {
    let (port, server) = scripted_server(vec![
        Step::Reply("220 mx.test\r\n"),
        Step::Command,
        Step::Reply("250-mx.test\r\n250 STARTTLS\r\n"),
        Step::Command,
        Step::Reply("220 Ready to start TLS\r\n"),
        Step::Hangup,
    ])
    .await;
    let mut transcript = Transcript::new();

    let stream = connect("127.0.0.1", port, Duration::from_secs(5))
        .await
        .unwrap();
    let client = Client::from_stream(stream, &mut transcript).await.unwrap();
    let client = client.ehlo("client.test").await.unwrap();
    assert!(client.server_info().supports_starttls());

    let err = client.starttls("localhost").await.unwrap_err();
    assert!(matches!(err, Error::Tls(_)), "got {err:?}");
    assert!(transcript.to_string().contains("> STARTTLS"));
    server.await.unwrap();
}

#[tokio::test]
async fn starttls_upgrades_and_repeats_ehlo() {
    let (acceptor, client_config) = localhost_tls();
    let (port, server) = scripted_server(vec![
        Step::Reply("220 mx.test ESMTP\r\n"),
        Step::Command, // EHLO
        Step::Reply("250-mx.test\r\n250-STARTTLS\r\n250 8BITMIME\r\n"),
        Step::Command, // STARTTLS
        Step::Reply("220 2.0.0 Ready to start TLS\r\n"),
        Step::AcceptTls(acceptor),
        Step::Command, // EHLO again
        Step::Reply("250-mx.test\r\n250 AUTH LOGIN\r\n"),
        Step::Command, // MAIL FROM
        Step::Reply("250 Ok\r\n"),
        Step::Command, // RCPT TO
        Step::Reply("250 Ok\r\n"),
        Step::Command, // DATA
        Step::Reply("354 go ahead\r\n"),
        Step::Payload,
        Step::Reply("250 queued\r\n"),
        Step::Command, // QUIT
        Step::Reply("221 Bye\r\n"),
    ])
    .await;
    let mut transcript = Transcript::new();

    let stream = connect_with("localhost", port, Duration::from_secs(5), client_config)
        .await
        .unwrap();
    let client = Client::from_stream(stream, &mut transcript).await.unwrap();
    let client = client.ehlo("client.test").await.unwrap();
    assert!(client.server_info().supports_starttls());

    let client = client.starttls("localhost").await.unwrap();
    assert!(client.is_tls());
    assert!(!client.server_info().supports_starttls());
    assert!(client.server_info().supports("AUTH"));

    let client = client
        .mail_from(&Address::new("a@client.test").unwrap())
        .await
        .unwrap();
    let client = client
        .rcpt_to(&Address::new("bob@y.com").unwrap())
        .await
        .unwrap();
    let client = client.data().await.unwrap();
    let client = client.send_message("Subject: Hi\r\n\r\nover TLS").await.unwrap();
    client.quit().await.unwrap();

    let log = server.await.unwrap();
    assert_eq!(
        log.commands,
        vec![
            "EHLO client.test",
            "STARTTLS",
            "EHLO client.test",
            "MAIL FROM:<a@client.test>",
            "RCPT TO:<bob@y.com>",
            "DATA",
            "QUIT",
        ]
    );
    assert_eq!(log.payload, "Subject: Hi\r\n\r\nover TLS\r\n.\r\n");
    assert!(log.closed_by_client);
}

#[tokio::test]
async fn implicit_tls_session() {
    let (acceptor, client_config) = localhost_tls();
    let (port, server) = scripted_server(vec![
        Step::AcceptTls(acceptor),
        Step::Reply("220 mx.test ESMTP\r\n"),
        Step::Command, // EHLO
        Step::Reply("250-mx.test\r\n250 AUTH LOGIN\r\n"),
        Step::Command, // QUIT
        Step::Reply("221 Bye\r\n"),
    ])
    .await;
    let mut transcript = Transcript::new();

    let stream = connect_tls_with("localhost", port, Duration::from_secs(5), client_config)
        .await
        .unwrap();
    assert!(stream.is_tls());
    let client = Client::from_stream(stream, &mut transcript).await.unwrap();
    let client = client.ehlo("client.test").await.unwrap();
    assert!(client.is_tls());
    assert!(client.server_info().supports("AUTH"));
    client.quit().await.unwrap();

    let log = server.await.unwrap();
    assert_eq!(log.commands, vec!["EHLO client.test", "QUIT"]);
    assert!(log.closed_by_client);
}

#[tokio::test]
async fn trickling_reply_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        // Each line arrives well inside the timeout; the reply never ends.
        while socket.write_all(b"220-x\r\n").await.is_ok() {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    });
    let mut transcript = Transcript::new();

    let started = Instant::now();
    let stream = connect("127.0.0.1", port, Duration::from_secs(1))
        .await
        .unwrap();
    let err = Client::from_stream(stream, &mut transcript)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout("reading reply")), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(3));
    server.abort();
}

#[tokio::test]
async fn overlong_reply_is_protocol_error() {
    let flood: &'static str = "220-x\r\n".repeat(600).leak();
    let (port, server) = scripted_server(vec![Step::Reply(flood)]).await;
    let mut transcript = Transcript::new();

    let stream = connect("127.0.0.1", port, Duration::from_secs(5))
        .await
        .unwrap();
    let err = Client::from_stream(stream, &mut transcript)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Protocol(_)), "got {err:?}");
    assert_eq!(transcript.entries().len(), 512);
    server.await.unwrap();
}
