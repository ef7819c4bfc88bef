//! Dispatch configuration

use std::{collections::HashMap, fmt};

use crate::domain::communication::errors::EmailError;

/// An opaque provider API key
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a raw API key
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw key, for the transport only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Read-only settings for composing and dispatching messages
#[derive(Clone, Debug, Default)]
pub struct DispatchOptions {
    /// The administrator address, used as the sender of every message
    pub admin_email: String,

    /// The administrator display name
    pub admin_name: Option<String>,

    /// The API key used when no named key is requested
    pub api_key: ApiKey,

    /// Alternate API keys by name
    pub additional_api_keys: HashMap<String, ApiKey>,

    /// Apply the default template when no template is requested
    pub always_template_emails: bool,

    /// Suffix the subject with the environment name outside production
    pub add_environment_suffix: bool,
}

impl DispatchOptions {
    /// Resolves the API key for a send.
    ///
    /// An empty or absent `name` selects the default key. A name missing from
    /// [`DispatchOptions::additional_api_keys`] is an error; there is no fallback.
    pub fn api_key(&self, name: Option<&str>) -> Result<&ApiKey, EmailError> {
        match name.filter(|name| !name.is_empty()) {
            None => Ok(&self.api_key),
            Some(name) => self
                .additional_api_keys
                .get(name)
                .ok_or_else(|| EmailError::UnknownCredential(name.to_string())),
        }
    }
}
