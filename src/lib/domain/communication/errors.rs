//! Error types for the communication module

use thiserror::Error;
use tracing::debug;

use crate::domain::communication::email_addresses::EmailAddressError;

/// Errors that can occur when composing or dispatching an email
#[derive(Debug, Error)]
pub enum EmailError {
    /// A mandatory argument was missing or empty
    #[error("{0} is required")]
    InvalidArgument(&'static str),

    /// A mandatory address could not be parsed
    #[error("invalid {field} address")]
    InvalidAddress {
        /// The argument the address was supplied for
        field: &'static str,

        /// The parse failure
        #[source]
        source: EmailAddressError,
    },

    /// A named API key was requested that is not configured
    #[error("no api key named \"{0}\" is configured")]
    UnknownCredential(String),

    /// The body could not be rendered into a template
    #[error(transparent)]
    Template(TemplateError),

    /// The transport failed to deliver the message
    #[error(transparent)]
    Transport(TransportError),

    /// Unknown error
    #[error(transparent)]
    UnknownError(#[from] anyhow::Error),
}

impl From<TemplateError> for EmailError {
    fn from(err: TemplateError) -> Self {
        debug!("TemplateError -> EmailError");

        EmailError::Template(err)
    }
}

impl From<TransportError> for EmailError {
    fn from(err: TransportError) -> Self {
        debug!("TransportError -> EmailError");

        EmailError::Transport(err)
    }
}

/// Template rendering errors
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No template is registered under the requested name
    #[error("template \"{0}\" does not exist")]
    NotFound(String),

    /// Unknown error
    #[error(transparent)]
    UnknownError(#[from] anyhow::Error),
}

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// The provider could not be reached
    #[error("could not reach the email provider: {0}")]
    Unreachable(String),

    /// Unknown error
    #[error(transparent)]
    UnknownError(#[from] anyhow::Error),
}
