//! SendGrid email transport implementation

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::communication::{
    email_addresses::{EmailAddress, NamedAddress},
    errors::TransportError,
    message::{OutboundMessage, Recipients},
    options::{ApiKey, DispatchOptions},
    transport::Transport,
};

/// The public SendGrid v3 API
pub const SENDGRID_API_BASE: &str = "https://api.sendgrid.com/v3";

/// SendGrid configuration
#[derive(Clone, Default, Debug, Parser)]
pub struct SendGridConfig {
    /// The administrator address, used as the sender
    #[clap(long, env = "SENDGRID_ADMIN_EMAIL")]
    pub admin_email: String,

    /// The administrator display name
    #[clap(long, env = "SENDGRID_ADMIN_NAME")]
    pub admin_name: Option<String>,

    /// The default SendGrid API key
    #[clap(long, env = "SENDGRID_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Additional API keys as comma separated `name=key` pairs
    #[clap(
        long,
        env = "SENDGRID_ADDITIONAL_API_KEYS",
        value_delimiter = ',',
        value_parser = parse_named_key,
        hide_env_values = true
    )]
    pub additional_api_keys: Vec<(String, String)>,

    /// Render every email into the default template unless another is requested
    #[clap(long, env = "SENDGRID_ALWAYS_TEMPLATE_EMAILS")]
    pub always_template_emails: bool,

    /// Suffix subjects with the environment name outside production
    #[clap(long, env = "SENDGRID_ADD_ENVIRONMENT_SUFFIX")]
    pub add_environment_suffix: bool,

    /// The SendGrid API base URL
    #[clap(long, env = "SENDGRID_API_BASE", default_value = SENDGRID_API_BASE)]
    pub api_base: String,

    /// Request timeout in seconds
    #[clap(long, env = "SENDGRID_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,
}

fn parse_named_key(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, key)) if !name.trim().is_empty() && !key.trim().is_empty() => {
            Ok((name.trim().to_string(), key.trim().to_string()))
        }
        _ => Err(format!("expected name=key, got \"{raw}\"")),
    }
}

/// SendGrid configuration errors
#[derive(Debug, Error)]
pub enum SendGridConfigError {
    /// The same key name was configured twice
    #[error("api key \"{0}\" is configured more than once")]
    DuplicateApiKeyName(String),
}

impl TryFrom<SendGridConfig> for DispatchOptions {
    type Error = SendGridConfigError;

    fn try_from(config: SendGridConfig) -> Result<Self, Self::Error> {
        let mut additional_api_keys = HashMap::new();

        for (name, key) in config.additional_api_keys {
            if additional_api_keys.contains_key(&name) {
                return Err(SendGridConfigError::DuplicateApiKeyName(name));
            }

            additional_api_keys.insert(name, ApiKey::new(key));
        }

        Ok(DispatchOptions {
            admin_email: config.admin_email,
            admin_name: config.admin_name.filter(|name| !name.is_empty()),
            api_key: ApiKey::new(config.api_key),
            additional_api_keys,
            always_template_emails: config.always_template_emails,
            add_environment_suffix: config.add_environment_suffix,
        })
    }
}

#[derive(Debug, Serialize)]
struct Contact<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl<'a> From<&'a NamedAddress> for Contact<'a> {
    fn from(address: &'a NamedAddress) -> Self {
        Self {
            email: address.email.as_str(),
            name: address.name.as_deref(),
        }
    }
}

impl<'a> From<&'a EmailAddress> for Contact<'a> {
    fn from(address: &'a EmailAddress) -> Self {
        Self {
            email: address.as_str(),
            name: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Contact<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct AttachmentBody<'a> {
    content: &'a str,
    filename: &'a str,
    disposition: &'a str,
}

/// Body of a `POST /mail/send` request
#[derive(Debug, Serialize)]
struct MailSendRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Contact<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<Contact<'a>>,
    subject: &'a str,
    content: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<AttachmentBody<'a>>,
}

impl<'a> From<&'a OutboundMessage> for MailSendRequest<'a> {
    fn from(message: &'a OutboundMessage) -> Self {
        // Each recipient of a multi-recipient message gets its own personalization
        // so nobody sees the other addresses.
        let personalizations = match &message.recipients {
            Recipients::Single(to) => vec![Personalization {
                to: vec![Contact::from(to)],
            }],
            Recipients::Multiple(to) => to
                .iter()
                .map(|to| Personalization {
                    to: vec![Contact::from(to)],
                })
                .collect(),
        };

        Self {
            personalizations,
            from: Contact::from(&message.from),
            reply_to: message.reply_to.as_ref().map(Contact::from),
            subject: &message.subject,
            content: vec![
                Content {
                    kind: "text/plain",
                    value: &message.plain_body,
                },
                Content {
                    kind: "text/html",
                    value: &message.html_body,
                },
            ],
            attachments: message
                .attachment
                .iter()
                .map(|attachment| AttachmentBody {
                    content: &attachment.content,
                    filename: &attachment.filename,
                    disposition: &attachment.disposition,
                })
                .collect(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        debug!("reqwest::Error -> TransportError");

        if err.is_connect() || err.is_timeout() {
            TransportError::Unreachable(err.to_string())
        } else {
            TransportError::UnknownError(err.into())
        }
    }
}

/// SendGrid transport
#[derive(Debug, Clone)]
pub struct SendGridTransport {
    client: reqwest::Client,
    api_base: String,
}

impl SendGridTransport {
    /// Create a new SendGrid transport
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Create a new SendGrid transport from configuration
    pub fn from_config(config: &SendGridConfig) -> Result<Self, TransportError> {
        Self::new(&config.api_base, Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl Transport for SendGridTransport {
    async fn send_message(
        &self,
        api_key: &ApiKey,
        message: &OutboundMessage,
    ) -> Result<bool, TransportError> {
        let response = self
            .client
            .post(format!("{}/mail/send", self.api_base))
            .bearer_auth(api_key.expose())
            .json(&MailSendRequest::from(message))
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            return Ok(true);
        }

        let body = response.text().await.unwrap_or_default();

        warn!(status = status.as_u16(), body = %body, "SendGrid refused the message");

        Ok(false)
    }
}
