//! Outbound email message

use std::slice;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::domain::communication::email_addresses::{EmailAddress, NamedAddress};

/// The disposition given to every attachment
pub const ATTACHMENT_DISPOSITION: &str = "attachment";

/// The delivery targets of a message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recipients {
    /// Exactly one recipient
    Single(EmailAddress),

    /// Two or more recipients, delivered individually
    Multiple(Vec<EmailAddress>),
}

impl Recipients {
    /// All recipients, the primary one first
    pub fn as_slice(&self) -> &[EmailAddress] {
        match self {
            Self::Single(address) => slice::from_ref(address),
            Self::Multiple(addresses) => addresses,
        }
    }

    /// Whether this is a multi-recipient message
    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::Multiple(_))
    }
}

/// A file attached to a message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    /// The base64-encoded file content
    pub content: String,

    /// The file name shown to the recipient
    pub filename: String,

    /// The content disposition
    pub disposition: String,
}

impl Attachment {
    /// Encodes `file_content` as an attachment named `file_name`.
    pub fn new(file_content: &[u8], file_name: &str) -> Self {
        Self {
            content: STANDARD.encode(file_content),
            filename: file_name.to_string(),
            disposition: ATTACHMENT_DISPOSITION.to_string(),
        }
    }
}

/// A fully composed message, ready to hand to a transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    /// The sender of the email
    pub from: NamedAddress,

    /// The recipients of the email
    pub recipients: Recipients,

    /// The subject of the email
    pub subject: String,

    /// The plain text body of the email
    pub plain_body: String,

    /// The HTML body of the email
    pub html_body: String,

    /// Where replies should go
    pub reply_to: Option<NamedAddress>,

    /// The attached file
    pub attachment: Option<Attachment>,
}

impl OutboundMessage {
    /// Creates a message to a single recipient
    pub fn single(
        from: NamedAddress,
        to: EmailAddress,
        subject: String,
        plain_body: String,
        html_body: String,
    ) -> Self {
        Self::with_recipients(from, Recipients::Single(to), subject, plain_body, html_body)
    }

    /// Creates a message to several recipients
    pub fn multiple(
        from: NamedAddress,
        to: Vec<EmailAddress>,
        subject: String,
        plain_body: String,
        html_body: String,
    ) -> Self {
        Self::with_recipients(from, Recipients::Multiple(to), subject, plain_body, html_body)
    }

    fn with_recipients(
        from: NamedAddress,
        recipients: Recipients,
        subject: String,
        plain_body: String,
        html_body: String,
    ) -> Self {
        Self {
            from,
            recipients,
            subject,
            plain_body,
            html_body,
            reply_to: None,
            attachment: None,
        }
    }

    /// Sets the reply-to address
    pub fn set_reply_to(&mut self, reply_to: NamedAddress) {
        self.reply_to = Some(reply_to);
    }

    /// Attaches a file, replacing any previous attachment
    pub fn attach(&mut self, attachment: Attachment) {
        self.attachment = Some(attachment);
    }
}
