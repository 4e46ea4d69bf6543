use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use harmony_client::client::{DEFAULT_AUTH_BASE_URL, DEFAULT_MESSAGE_BASE_URL};
use harmony_client::{Attribute, HarmonyClient, HarmonyClientBuilder, OutboundMessage, Recipient};

/// Send a real-time message through Epsilon Harmony
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// OAuth client id
    #[arg(long, env = "HARMONY_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, env = "HARMONY_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Harmony user name
    #[arg(short = 'u', long, env = "HARMONY_USERNAME")]
    pub username: Option<String>,

    /// Harmony user password
    #[arg(long, env = "HARMONY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Auth API base URL
    #[arg(long, env = "HARMONY_AUTH_URL", default_value = DEFAULT_AUTH_BASE_URL)]
    pub auth_url: String,

    /// Messaging API base URL
    #[arg(long, env = "HARMONY_MESSAGE_URL", default_value = DEFAULT_MESSAGE_BASE_URL)]
    pub message_url: String,

    /// Routing identifier (organization unit) sent as X-OUID
    #[arg(short = 'o', long, env = "HARMONY_OUID")]
    pub ouid: Option<String>,

    /// JSON file holding the full message request
    #[arg(short = 'f', long, conflicts_with_all = ["message_id", "recipient"])]
    pub message_file: Option<String>,

    /// Message id (used with --recipient instead of --message-file)
    #[arg(short = 'm', long)]
    pub message_id: Option<String>,

    /// Recipient email address (repeatable)
    #[arg(short = 'r', long)]
    pub recipient: Vec<String>,

    /// Default attribute as name=value (repeatable)
    #[arg(short = 'a', long = "attribute")]
    pub attributes: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "60")]
    pub http_timeout: u64,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "30")]
    pub connect_timeout: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Credentials (passed straight to the client builder)
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,

    // Endpoints
    pub auth_base_url: String,
    pub message_base_url: String,

    // Message
    pub ouid: String,
    pub message: MessageSource,

    // HTTP client
    pub http_request_timeout: u64,
    pub http_connect_timeout: u64,

    pub log_level: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MessageSource {
    File(PathBuf),
    Inline {
        id: String,
        recipients: Vec<String>,
        attributes: Vec<(String, String)>,
    },
}

impl Config {
    /// Load configuration with priority: CLI > ENV (.env included) > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(args: CliArgs) -> Result<Self> {
        let message = match (args.message_file, args.message_id) {
            (Some(path), _) => MessageSource::File(expand_tilde(&path)),
            (None, Some(id)) => {
                if args.recipient.is_empty() {
                    anyhow::bail!("at least one --recipient is required with --message-id");
                }
                MessageSource::Inline {
                    id,
                    recipients: args.recipient,
                    attributes: args
                        .attributes
                        .iter()
                        .map(|a| parse_attribute(a))
                        .collect::<Result<_>>()?,
                }
            }
            (None, None) => anyhow::bail!("either --message-file or --message-id is required"),
        };

        Ok(Config {
            client_id: args
                .client_id
                .context("HARMONY_CLIENT_ID is required (use --client-id or set the env var)")?,
            client_secret: args.client_secret.context(
                "HARMONY_CLIENT_SECRET is required (use --client-secret or set the env var)",
            )?,
            username: args
                .username
                .context("HARMONY_USERNAME is required (use -u or set the env var)")?,
            password: args
                .password
                .context("HARMONY_PASSWORD is required (use --password or set the env var)")?,
            auth_base_url: args.auth_url,
            message_base_url: args.message_url,
            ouid: args
                .ouid
                .context("HARMONY_OUID is required (use -o or set the env var)")?,
            message,
            http_request_timeout: args.http_timeout,
            http_connect_timeout: args.connect_timeout,
            log_level: args.log_level,
        })
    }

    /// Client builder carrying every connection setting
    pub fn client_builder(&self) -> HarmonyClientBuilder {
        HarmonyClient::builder()
            .auth_base_url(&self.auth_base_url)
            .message_base_url(&self.message_base_url)
            .client_id(&self.client_id)
            .client_secret(&self.client_secret)
            .username(&self.username)
            .password(&self.password)
            .request_timeout(Duration::from_secs(self.http_request_timeout))
            .connect_timeout(Duration::from_secs(self.http_connect_timeout))
    }

    /// Read or assemble the message to send
    pub fn load_message(&self) -> Result<OutboundMessage> {
        match &self.message {
            MessageSource::File(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read message file: {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse message file: {}", path.display()))
            }
            MessageSource::Inline {
                id,
                recipients,
                attributes,
            } => {
                let message = OutboundMessage::new(
                    id.clone(),
                    recipients.iter().map(Recipient::new).collect(),
                );
                if attributes.is_empty() {
                    Ok(message)
                } else {
                    Ok(message.with_default_attributes(
                        attributes
                            .iter()
                            .map(|(name, value)| Attribute::new(name, value))
                            .collect(),
                    ))
                }
            }
        }
    }
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a `name=value` attribute flag
fn parse_attribute(s: &str) -> Result<(String, String)> {
    let (name, value) = s
        .split_once('=')
        .with_context(|| format!("attribute must be name=value, got: {}", s))?;
    if name.is_empty() {
        anyhow::bail!("attribute name must not be empty: {}", s);
    }
    Ok((name.to_string(), value.to_string()))
}
