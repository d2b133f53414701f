//! Delivery through an HTTPS email API (Resend-compatible `POST /emails`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{HttpApiConfig, Sender};
use crate::error::DeliveryError;
use crate::message::{Message, format_mailbox};

/// Longest response body quoted in a diagnostic.
const MAX_BODY_IN_DIAGNOSTIC: usize = 512;

/// Request body accepted by the API.
#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: String,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    reply_to: [String; 1],
}

/// Successful response body.
#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: Option<String>,
}

/// Posts messages to an HTTPS email API with bearer-token auth.
#[derive(Debug, Clone)]
pub struct HttpApiTransport {
    config: HttpApiConfig,
    from_name: String,
    timeout: Duration,
}

impl HttpApiTransport {
    /// Creates a transport bound to the given API settings.
    #[must_use]
    pub fn new(config: HttpApiConfig, sender: &Sender, timeout: Duration) -> Self {
        Self {
            config,
            from_name: sender.name.clone(),
            timeout,
        }
    }

    /// Endpoint messages are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Sends `message` with one API call.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::ConfigurationMissing`] without an API key,
    /// [`DeliveryError::Encoding`] if the body cannot be serialized,
    /// [`DeliveryError::Connection`] on transport failures and
    /// [`DeliveryError::RemoteRejection`] for non-2xx responses.
    pub async fn send(&self, message: &Message) -> Result<(), DeliveryError> {
        if self.config.api_key.is_empty() {
            return Err(DeliveryError::ConfigurationMissing(
                "API key is not set (MAIL_API_KEY)".into(),
            ));
        }

        let body = serde_json::to_vec(&self.request_body(message))
            .map_err(|e| DeliveryError::Encoding(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .user_agent(crate::message::MAILER)
            .build()
            .map_err(|e| DeliveryError::Connection(format!("HTTP client setup failed: {e}")))?;

        let response = client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                };
                DeliveryError::Connection(format!("{}: {reason}", self.config.endpoint))
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            tracing::warn!("Email API answered {}", status);
            return Err(DeliveryError::RemoteRejection(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate(&text, MAX_BODY_IN_DIAGNOSTIC)
            )));
        }

        match serde_json::from_str::<SendEmailResponse>(&text) {
            Ok(SendEmailResponse { id: Some(id) }) => {
                tracing::info!("Email API accepted message {}", id);
            }
            _ => tracing::info!("Email API accepted message (HTTP {})", status.as_u16()),
        }
        Ok(())
    }

    fn request_body<'a>(&self, message: &'a Message) -> SendEmailRequest<'a> {
        SendEmailRequest {
            from: format_mailbox(&self.from_name, &self.config.from_address),
            to: [message.recipient_address()],
            subject: message.subject(),
            text: message.body(),
            reply_to: [message.reply_to()],
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    struct Captured {
        head: String,
        body: String,
    }

    /// Serves one request with `status` and `body`, returning what was received.
    async fn one_shot_server(status: &'static str, body: &'static str) -> (String, JoinHandle<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/emails", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);

            let mut head = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).await.unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                head.push_str(&line);
            }

            let mut buf = vec![0u8; content_length];
            reader.read_exact(&mut buf).await.unwrap();

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            reader.get_mut().write_all(response.as_bytes()).await.unwrap();

            Captured {
                head,
                body: String::from_utf8(buf).unwrap(),
            }
        });

        (url, handle)
    }

    fn transport(endpoint: String, api_key: &str) -> HttpApiTransport {
        let config = HttpApiConfig {
            api_key: api_key.to_string(),
            from_address: "forms@example.org".to_string(),
            endpoint,
        };
        HttpApiTransport::new(config, &Sender::default(), Duration::from_secs(5))
    }

    fn message() -> Message {
        Message::new("Alice", "alice@x.com", "bob@y.com", "Hello", "Hi\nthere.")
    }

    #[tokio::test]
    async fn accepted_request_is_sent() {
        let (url, server) = one_shot_server("200 OK", r#"{"id":"4ef9a417"}"#).await;

        transport(url, "re_test_key").send(&message()).await.unwrap();

        let captured = server.await.unwrap();
        assert!(captured.head.starts_with("POST /emails HTTP/1.1"));
        assert!(
            captured
                .head
                .to_ascii_lowercase()
                .contains("authorization: bearer re_test_key")
        );

        let json: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "from": "Mail Tool <forms@example.org>",
                "to": ["bob@y.com"],
                "subject": "Hello",
                "text": "Hi\nthere.",
                "reply_to": ["Alice <alice@x.com>"],
            })
        );
    }

    #[tokio::test]
    async fn unauthorized_is_remote_rejection_with_status() {
        let (url, server) =
            one_shot_server("401 Unauthorized", r#"{"message":"API key is invalid"}"#).await;

        let err = transport(url, "wrong").send(&message()).await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, DeliveryError::RemoteRejection(_)));
        let text = err.to_string();
        assert!(text.contains("401"));
        assert!(text.contains("API key is invalid"));
        assert!(!text.contains("wrong"));
    }

    #[tokio::test]
    async fn refused_connection_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/emails", listener.local_addr().unwrap());
        drop(listener);

        let err = transport(url, "key").send(&message()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Connection(_)));
    }

    #[tokio::test]
    async fn missing_key_is_configuration_error() {
        let err = transport("http://127.0.0.1:9/emails".into(), "")
            .send(&message())
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::ConfigurationMissing(_)));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("short", 64), "short");
    }
}
