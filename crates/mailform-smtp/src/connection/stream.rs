//! Low-level SMTP stream handling.

use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};

/// Underlying socket (TCP or TLS).
#[derive(Debug)]
enum Socket {
    /// Plain TCP connection.
    Tcp(BufReader<TcpStream>),
    /// TLS-encrypted connection.
    Tls(Box<BufReader<tokio_rustls::client::TlsStream<TcpStream>>>),
}

/// SMTP stream with a per-operation timeout.
///
/// Dropping the stream closes the socket.
#[derive(Debug)]
pub struct SmtpStream {
    socket: Socket,
    io_timeout: Duration,
    tls_config: Arc<ClientConfig>,
}

impl SmtpStream {
    /// Reads one line from the stream, without its line terminator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoResponse`] if the peer closed the connection,
    /// [`Error::Timeout`] if no line arrived in time.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = match &mut self.socket {
            Socket::Tcp(reader) => {
                with_timeout(self.io_timeout, "reading reply", reader.read_line(&mut line)).await?
            }
            Socket::Tls(reader) => {
                with_timeout(self.io_timeout, "reading reply", reader.read_line(&mut line)).await?
            }
        };
        if read == 0 {
            return Err(Error::NoResponse);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Writes data to the stream and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or times out.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let timeout = self.io_timeout;
        match &mut self.socket {
            Socket::Tcp(reader) => {
                let stream = reader.get_mut();
                with_timeout(timeout, "writing command", async {
                    stream.write_all(data).await?;
                    stream.flush().await
                })
                .await
            }
            Socket::Tls(reader) => {
                let stream = reader.get_mut();
                with_timeout(timeout, "writing command", async {
                    stream.write_all(data).await?;
                    stream.flush().await
                })
                .await
            }
        }
    }

    /// Time limit applied to each read and write.
    #[must_use]
    pub const fn io_timeout(&self) -> Duration {
        self.io_timeout
    }

    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self.socket, Socket::Tls(_))
    }

    /// Upgrades a TCP stream to TLS in place (STARTTLS).
    ///
    /// Uses the TLS configuration the stream was connected with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] if the stream is already encrypted or the
    /// handshake fails.
    pub async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        let tcp_stream = match self.socket {
            Socket::Tcp(reader) => reader.into_inner(),
            Socket::Tls(_) => return Err(Error::Tls("Already using TLS".into())),
        };

        let socket = tls_handshake(tcp_stream, hostname, self.io_timeout, &self.tls_config).await?;
        Ok(Self {
            socket,
            io_timeout: self.io_timeout,
            tls_config: self.tls_config,
        })
    }
}

/// Connects to an SMTP server over plain TCP.
///
/// `timeout` bounds the connect and every later read and write. A later
/// STARTTLS verifies the server against the webpki roots.
///
/// # Errors
///
/// Returns an error if the connection fails or times out.
pub async fn connect(hostname: &str, port: u16, timeout: Duration) -> Result<SmtpStream> {
    connect_with(hostname, port, timeout, default_tls_config()).await
}

/// Like [`connect`], with the TLS configuration used by a later STARTTLS.
///
/// # Errors
///
/// Returns an error if the connection fails or times out.
pub async fn connect_with(
    hostname: &str,
    port: u16,
    timeout: Duration,
    tls_config: Arc<ClientConfig>,
) -> Result<SmtpStream> {
    let stream = with_timeout(timeout, "connecting", TcpStream::connect((hostname, port))).await?;
    Ok(SmtpStream {
        socket: Socket::Tcp(BufReader::new(stream)),
        io_timeout: timeout,
        tls_config,
    })
}

/// Connects to an SMTP server over TLS (implicit TLS on port 465).
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails.
pub async fn connect_tls(hostname: &str, port: u16, timeout: Duration) -> Result<SmtpStream> {
    connect_tls_with(hostname, port, timeout, default_tls_config()).await
}

/// Like [`connect_tls`], verifying the server with `tls_config`.
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails.
pub async fn connect_tls_with(
    hostname: &str,
    port: u16,
    timeout: Duration,
    tls_config: Arc<ClientConfig>,
) -> Result<SmtpStream> {
    let tcp_stream =
        with_timeout(timeout, "connecting", TcpStream::connect((hostname, port))).await?;
    let socket = tls_handshake(tcp_stream, hostname, timeout, &tls_config).await?;
    Ok(SmtpStream {
        socket,
        io_timeout: timeout,
        tls_config,
    })
}

/// Client configuration trusting the webpki root certificates.
#[must_use]
pub fn default_tls_config() -> Arc<ClientConfig> {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

async fn tls_handshake(
    tcp_stream: TcpStream,
    hostname: &str,
    timeout: Duration,
    tls_config: &Arc<ClientConfig>,
) -> Result<Socket> {
    let connector = TlsConnector::from(Arc::clone(tls_config));
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Tls(format!("Invalid hostname: {hostname}")))?;

    let tls_stream = tokio::time::timeout(timeout, connector.connect(server_name, tcp_stream))
        .await
        .map_err(|_| Error::Timeout("negotiating TLS"))?
        .map_err(|e| Error::Tls(e.to_string()))?;

    Ok(Socket::Tls(Box::new(BufReader::new(tls_stream))))
}

async fn with_timeout<T, F>(timeout: Duration, operation: &'static str, future: F) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| Error::Timeout(operation))?
        .map_err(Error::from)
}
