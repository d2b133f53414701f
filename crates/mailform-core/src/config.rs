//! Transport configuration, read once from the environment.

use std::time::Duration;

use crate::error::ConfigError;

/// Default `From` address when none is configured.
pub const DEFAULT_FROM_ADDRESS: &str = "no-reply@yourdomain.example";
/// Default `From` display name.
pub const DEFAULT_FROM_NAME: &str = "Mail Tool";
/// Default local agent command line.
pub const DEFAULT_SENDMAIL_COMMAND: &str = "/usr/sbin/sendmail -t -i";
/// Default HTTP API endpoint.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.resend.com/emails";
/// Default timeout for every network step.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Which transport delivers messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Host `sendmail`-compatible agent.
    #[default]
    LocalAgent,
    /// Direct SMTP session.
    Smtp,
    /// HTTPS email API.
    HttpApi,
}

impl TransportKind {
    /// Maps a configuration value to a transport.
    ///
    /// Unknown and empty values select the local agent.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "smtp" => Self::Smtp,
            "api" | "http" | "resend" => Self::HttpApi,
            _ => Self::LocalAgent,
        }
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocalAgent => "sendmail",
            Self::Smtp => "smtp",
            Self::HttpApi => "api",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SMTP connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encryption {
    /// No encryption (port 25). **Not recommended for production.**
    None,
    /// Start with plaintext, upgrade with STARTTLS (port 587).
    #[default]
    StartTls,
    /// TLS from the start (port 465).
    Implicit,
}

impl Encryption {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::StartTls => 587,
            Self::Implicit => 465,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "tls" | "starttls" => Some(Self::StartTls),
            "ssl" | "smtps" | "implicit" => Some(Self::Implicit),
            "none" | "plain" | "off" => Some(Self::None),
            _ => None,
        }
    }
}

/// Operator-controlled sender identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    /// Display name in the `From` header.
    pub name: String,
    /// Address in the `From` header.
    pub address: String,
    /// Envelope sender (`MAIL FROM`, `sendmail -f`).
    pub envelope_from: String,
}

impl Default for Sender {
    fn default() -> Self {
        Self {
            name: DEFAULT_FROM_NAME.to_string(),
            address: DEFAULT_FROM_ADDRESS.to_string(),
            envelope_from: DEFAULT_FROM_ADDRESS.to_string(),
        }
    }
}

/// Local agent settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAgentConfig {
    /// Program and leading arguments, split on whitespace.
    pub command: String,
    /// Relay host the agent is set up to use, reported in diagnostics.
    pub relay_host: Option<String>,
    /// Relay port, reported in diagnostics.
    pub relay_port: Option<u16>,
}

impl Default for LocalAgentConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_SENDMAIL_COMMAND.to_string(),
            relay_host: None,
            relay_port: None,
        }
    }
}

/// SMTP settings.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// AUTH LOGIN username; no AUTH when empty.
    pub username: String,
    /// AUTH LOGIN password.
    pub password: String,
    /// Security mode.
    pub encryption: Encryption,
    /// Name sent with EHLO.
    pub helo_name: String,
}

impl SmtpConfig {
    /// Creates a configuration for `host` with STARTTLS on port 587.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Encryption::StartTls.default_port(),
            username: String::new(),
            password: String::new(),
            encryption: Encryption::StartTls,
            helo_name: "localhost".to_string(),
        }
    }

    /// Returns true if AUTH should be performed.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self::new("")
    }
}

// Keeps the password out of logs and diagnostics.
impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("encryption", &self.encryption)
            .field("helo_name", &self.helo_name)
            .finish()
    }
}

/// HTTP API settings.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpApiConfig {
    /// Bearer token.
    pub api_key: String,
    /// Address the API sends from.
    pub from_address: String,
    /// Endpoint URL.
    pub endpoint: String,
}

impl Default for HttpApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
            endpoint: DEFAULT_API_ENDPOINT.to_string(),
        }
    }
}

impl std::fmt::Debug for HttpApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiConfig")
            .field("api_key", &"<redacted>")
            .field("from_address", &self.from_address)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Process-wide transport configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Selected transport.
    pub transport: TransportKind,
    /// Fixed sender identity.
    pub sender: Sender,
    /// Timeout for connect, each read/write, the HTTP call and the local agent run.
    pub timeout: Duration,
    /// Local agent settings.
    pub local_agent: LocalAgentConfig,
    /// SMTP settings.
    pub smtp: SmtpConfig,
    /// HTTP API settings.
    pub http_api: HttpApiConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            sender: Sender::default(),
            timeout: DEFAULT_TIMEOUT,
            local_agent: LocalAgentConfig::default(),
            smtp: SmtpConfig::default(),
            http_api: HttpApiConfig::default(),
        }
    }
}

impl TransportConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric or enumerated variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable or `None` when unset. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric or enumerated variable has an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let from_address = get("MAIL_FROM_ADDRESS").unwrap_or_else(|| DEFAULT_FROM_ADDRESS.into());
        let sender = Sender {
            name: get("MAIL_FROM_NAME").unwrap_or_else(|| DEFAULT_FROM_NAME.into()),
            envelope_from: get("MAIL_ENVELOPE_FROM").unwrap_or_else(|| from_address.clone()),
            address: from_address.clone(),
        };

        let timeout = match get("MAIL_TIMEOUT_SECS") {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(invalid("MAIL_TIMEOUT_SECS", value)),
            },
            None => DEFAULT_TIMEOUT,
        };

        let encryption = match get("SMTP_ENCRYPTION") {
            Some(value) => {
                Encryption::parse(&value).ok_or_else(|| invalid("SMTP_ENCRYPTION", value))?
            }
            None => Encryption::default(),
        };

        let smtp = SmtpConfig {
            host: get("SMTP_HOST").unwrap_or_default(),
            port: parse_port("SMTP_PORT", get("SMTP_PORT"))?
                .unwrap_or_else(|| encryption.default_port()),
            username: get("SMTP_USERNAME").unwrap_or_default(),
            // Passwords may legitimately have surrounding spaces
            password: lookup("SMTP_PASSWORD").unwrap_or_default(),
            encryption,
            helo_name: get("SMTP_HELO").unwrap_or_else(|| "localhost".into()),
        };

        let local_agent = LocalAgentConfig {
            command: get("SENDMAIL_PATH").unwrap_or_else(|| DEFAULT_SENDMAIL_COMMAND.into()),
            relay_host: get("MAIL_RELAY_HOST"),
            relay_port: parse_port("MAIL_RELAY_PORT", get("MAIL_RELAY_PORT"))?,
        };

        let http_api = HttpApiConfig {
            api_key: get("MAIL_API_KEY").unwrap_or_default(),
            from_address: get("MAIL_API_FROM").unwrap_or(from_address),
            endpoint: get("MAIL_API_ENDPOINT").unwrap_or_else(|| DEFAULT_API_ENDPOINT.into()),
        };

        Ok(Self {
            transport: TransportKind::parse(&get("MAIL_TRANSPORT").unwrap_or_default()),
            sender,
            timeout,
            local_agent,
            smtp,
            http_api,
        })
    }
}

fn parse_port(name: &'static str, value: Option<String>) -> Result<Option<u16>, ConfigError> {
    match value {
        Some(value) => match value.parse::<u16>() {
            Ok(port) if port > 0 => Ok(Some(port)),
            _ => Err(invalid(name, value)),
        },
        None => Ok(None),
    }
}

fn invalid(name: &'static str, value: String) -> ConfigError {
    ConfigError { name, value }
}
