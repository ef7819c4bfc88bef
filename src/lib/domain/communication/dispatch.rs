//! Email dispatch service

use std::{future::Future, sync::Arc};

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::runtime::Handle;
use tracing::info;

use crate::domain::communication::{
    email_addresses::{EmailAddress, NamedAddress},
    errors::EmailError,
    message_builder::{MessageBuilder, MessageDraft},
    options::DispatchOptions,
    transport::Transport,
};

/// A request to send one email
///
/// Only `to`, `subject` and `body_html` are mandatory; every other field defaults to "not set".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmailRequest {
    /// The primary recipient
    pub to: String,

    /// Copy recipients
    pub cc: Vec<String>,

    /// The subject
    pub subject: String,

    /// The HTML body
    pub body_html: String,

    /// Literal replacements applied to the body, in order
    pub tokens: Vec<(String, String)>,

    /// The template to render the body into
    pub template_name: Option<String>,

    /// The name of an additional API key to send with
    pub sender_key_name: Option<String>,
}

impl EmailRequest {
    /// Creates a request with the mandatory fields set.
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        body_html: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body_html: body_html.into(),
            ..Default::default()
        }
    }

    /// Sets the copy recipients
    pub fn cc<I, S>(mut self, cc: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cc = cc.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a body replacement
    pub fn token(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tokens.push((key.into(), value.into()));
        self
    }

    /// Sets the template
    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.template_name = Some(name.into());
        self
    }

    /// Sets the API key name
    pub fn sender_key(mut self, name: impl Into<String>) -> Self {
        self.sender_key_name = Some(name.into());
        self
    }
}

/// A reply-to address and its display name
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplyTo {
    /// The address replies go to
    pub address: String,

    /// The display name
    pub name: Option<String>,
}

impl ReplyTo {
    /// Creates a reply-to with an optional display name.
    pub fn new(address: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            address: address.into(),
            name: name.map(str::to_string),
        }
    }
}

/// A file to attach to a message
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileAttachment {
    /// The raw file content
    pub content: Vec<u8>,

    /// The file name the recipient sees
    pub file_name: String,
}

impl FileAttachment {
    /// Creates a new attachment
    pub fn new(content: impl Into<Vec<u8>>, file_name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            file_name: file_name.into(),
        }
    }
}

/// Applies each `(key, value)` replacement to `body` in order.
///
/// Replacements run over the already-replaced text, so a value inserted by one
/// token can be matched by a later key. An empty key is rejected.
pub fn substitute_tokens(body: &str, tokens: &[(String, String)]) -> Result<String, EmailError> {
    if tokens.iter().any(|(key, _)| key.is_empty()) {
        return Err(EmailError::InvalidArgument("tokens"));
    }

    Ok(tokens
        .iter()
        .fold(body.to_string(), |body, (key, value)| body.replace(key, value)))
}

/// Email service
#[async_trait]
pub trait EmailService: Clone + Send + Sync + 'static {
    /// The configured administrator address
    fn admin_email(&self) -> &str;

    /// The configured administrator name
    fn admin_name(&self) -> Option<&str>;

    /// Sends an email from the administrator.
    ///
    /// # Arguments
    /// * `request` - The [`EmailRequest`] to send.
    ///
    /// # Returns
    /// [`Ok`] with the transport's success flag, or an [`EmailError`] if the message
    /// could not be composed, the API key could not be resolved or the transport failed.
    async fn send(&self, request: &EmailRequest) -> Result<bool, EmailError>;

    /// Sends an email to the administrator.
    ///
    /// # Arguments
    /// * `cc` - Copy recipients.
    /// * `subject` - The subject of the email.
    /// * `body_html` - The HTML body of the email.
    async fn send_to_administrator(
        &self,
        cc: &[String],
        subject: &str,
        body_html: &str,
    ) -> Result<bool, EmailError>;

    /// Sends an email with a reply-to address.
    ///
    /// Fails with [`EmailError::InvalidArgument`] before anything else happens if the
    /// reply-to address is empty.
    async fn send_with_reply_to(
        &self,
        reply_to: &ReplyTo,
        request: &EmailRequest,
    ) -> Result<bool, EmailError>;

    /// Sends an email with a single attached file.
    async fn send_with_attachment(
        &self,
        attachment: &FileAttachment,
        request: &EmailRequest,
    ) -> Result<bool, EmailError>;
}

/// Email service implementation
#[derive(Debug)]
pub struct EmailServiceImpl<B, T>
where
    B: MessageBuilder,
    T: Transport,
{
    options: Arc<DispatchOptions>,
    builder: Arc<B>,
    transport: Arc<T>,
}

impl<B, T> Clone for EmailServiceImpl<B, T>
where
    B: MessageBuilder,
    T: Transport,
{
    fn clone(&self) -> Self {
        Self {
            options: Arc::clone(&self.options),
            builder: Arc::clone(&self.builder),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<B, T> EmailServiceImpl<B, T>
where
    B: MessageBuilder,
    T: Transport,
{
    /// Creates a new email service.
    pub fn new(options: DispatchOptions, builder: Arc<B>, transport: Arc<T>) -> Self {
        Self {
            options: Arc::new(options),
            builder,
            transport,
        }
    }

    /// Blocking form of [`EmailService::send`].
    ///
    /// Runs on a private runtime. Called from within an async runtime it fails with
    /// [`EmailError::UnknownError`].
    pub fn send_blocking(&self, request: &EmailRequest) -> Result<bool, EmailError> {
        block_on(self.send(request))?
    }

    /// Blocking form of [`EmailService::send_to_administrator`].
    pub fn send_to_administrator_blocking(
        &self,
        cc: &[String],
        subject: &str,
        body_html: &str,
    ) -> Result<bool, EmailError> {
        block_on(self.send_to_administrator(cc, subject, body_html))?
    }

    /// Blocking form of [`EmailService::send_with_reply_to`].
    pub fn send_with_reply_to_blocking(
        &self,
        reply_to: &ReplyTo,
        request: &EmailRequest,
    ) -> Result<bool, EmailError> {
        block_on(self.send_with_reply_to(reply_to, request))?
    }

    /// Blocking form of [`EmailService::send_with_attachment`].
    pub fn send_with_attachment_blocking(
        &self,
        attachment: &FileAttachment,
        request: &EmailRequest,
    ) -> Result<bool, EmailError> {
        block_on(self.send_with_attachment(attachment, request))?
    }

    fn draft(&self, request: &EmailRequest) -> Result<MessageDraft, EmailError> {
        Ok(MessageDraft {
            from: self.options.admin_email.clone(),
            from_name: self.options.admin_name.clone(),
            to: request.to.clone(),
            cc: request.cc.clone(),
            subject: request.subject.clone(),
            body_html: substitute_tokens(&request.body_html, &request.tokens)?,
            template_name: request.template_name.clone(),
        })
    }

    async fn dispatch(
        &self,
        request: &EmailRequest,
        attachment: Option<&FileAttachment>,
        reply_to: Option<NamedAddress>,
    ) -> Result<bool, EmailError> {
        let draft = self.draft(request)?;

        let mut message = match attachment {
            Some(file) => {
                self.builder
                    .create_message_with_attachment(&draft, &file.content, &file.file_name)?
            }
            None => self.builder.create_message(&draft)?,
        };

        if let Some(reply_to) = reply_to {
            message.set_reply_to(reply_to);
        }

        let sender_key_name = request.sender_key_name.as_deref();
        let api_key = self.options.api_key(sender_key_name)?;

        info!(
            recipients = message.recipients.as_slice().len(),
            api_key = sender_key_name.filter(|name| !name.is_empty()).unwrap_or("default"),
            "sending email"
        );

        Ok(self.transport.send_message(api_key, &message).await?)
    }
}

fn block_on<F: Future>(future: F) -> Result<F::Output, EmailError> {
    if Handle::try_current().is_ok() {
        return Err(EmailError::UnknownError(anyhow!(
            "blocking sends cannot run inside an async runtime"
        )));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| EmailError::UnknownError(err.into()))?;

    Ok(runtime.block_on(future))
}

#[async_trait]
impl<B, T> EmailService for EmailServiceImpl<B, T>
where
    B: MessageBuilder,
    T: Transport,
{
    fn admin_email(&self) -> &str {
        &self.options.admin_email
    }

    fn admin_name(&self) -> Option<&str> {
        self.options.admin_name.as_deref()
    }

    async fn send(&self, request: &EmailRequest) -> Result<bool, EmailError> {
        self.dispatch(request, None, None).await
    }

    async fn send_to_administrator(
        &self,
        cc: &[String],
        subject: &str,
        body_html: &str,
    ) -> Result<bool, EmailError> {
        let request = EmailRequest::new(&self.options.admin_email, subject, body_html)
            .cc(cc.iter().cloned());

        self.send(&request).await
    }

    async fn send_with_reply_to(
        &self,
        reply_to: &ReplyTo,
        request: &EmailRequest,
    ) -> Result<bool, EmailError> {
        if reply_to.address.is_empty() {
            return Err(EmailError::InvalidArgument("reply_to"));
        }

        let address = EmailAddress::new(&reply_to.address).map_err(|source| {
            EmailError::InvalidAddress {
                field: "reply_to",
                source,
            }
        })?;

        let reply_to = NamedAddress::new(address, reply_to.name.as_deref());

        self.dispatch(request, None, Some(reply_to)).await
    }

    async fn send_with_attachment(
        &self,
        attachment: &FileAttachment,
        request: &EmailRequest,
    ) -> Result<bool, EmailError> {
        self.dispatch(request, Some(attachment), None).await
    }
}
