//! Message composition

use std::{borrow::Cow, sync::Arc};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::mock;

use crate::domain::communication::{
    email_addresses::{EmailAddress, NamedAddress},
    environment::EnvironmentProbe,
    errors::EmailError,
    message::{Attachment, OutboundMessage},
    options::DispatchOptions,
    templates::{TemplateRenderer, DEFAULT_TEMPLATE},
};

lazy_static! {
    static ref TAG_REGEX: Regex = Regex::new(r"<[^>]*>").unwrap();
}

/// The loosely specified inputs of a message
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageDraft {
    /// Sender address, mandatory
    pub from: String,

    /// Sender display name
    pub from_name: Option<String>,

    /// Primary recipient, mandatory
    pub to: String,

    /// Copy recipients; malformed entries are skipped
    pub cc: Vec<String>,

    /// Subject, mandatory
    pub subject: String,

    /// HTML body, mandatory
    pub body_html: String,

    /// Template to render the body into
    pub template_name: Option<String>,
}

/// Which template, if any, a message body is rendered into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateChoice<'a> {
    /// The default template
    Default,

    /// An explicitly requested template
    Named(&'a str),

    /// The body is used as supplied
    Untemplated,
}

impl<'a> TemplateChoice<'a> {
    /// Selects the template for a message.
    ///
    /// | always template | template requested | choice        |
    /// |-----------------|--------------------|---------------|
    /// | true            | no                 | `Default`     |
    /// | any             | yes                | `Named`       |
    /// | false           | no                 | `Untemplated` |
    pub fn select(always_template: bool, requested: Option<&'a str>) -> Self {
        match (always_template, requested.filter(|name| !name.is_empty())) {
            (true, None) => Self::Default,
            (_, Some(name)) => Self::Named(name),
            (false, None) => Self::Untemplated,
        }
    }

    /// The name to hand to the renderer
    pub fn template_name(&self) -> Option<&'a str> {
        match *self {
            Self::Default => Some(DEFAULT_TEMPLATE),
            Self::Named(name) => Some(name),
            Self::Untemplated => None,
        }
    }
}

/// Returns the subject suffix for the current environment, if one applies.
///
/// A suffix is only produced when `add_suffix` is set and the environment is not production.
pub fn environment_suffix<E: EnvironmentProbe + ?Sized>(
    add_suffix: bool,
    environment: &E,
) -> Option<String> {
    (add_suffix && !environment.is_production()).then(|| format!(" ({})", environment.name()))
}

/// Removes everything between `<` and `>`, leaving the text content.
///
/// Entities are not decoded and whitespace is left alone.
pub fn strip_tags(html: &str) -> Cow<'_, str> {
    TAG_REGEX.replace_all(html, "")
}

/// Builds outbound messages from drafts
pub trait MessageBuilder: Clone + Send + Sync + 'static {
    /// Creates a message from a draft.
    ///
    /// # Arguments
    /// * `draft` - The [`MessageDraft`] to compose.
    ///
    /// # Returns
    /// The composed [`OutboundMessage`], or [`EmailError::InvalidArgument`] if `from`, `to`,
    /// `subject` or `body_html` is empty.
    fn create_message(&self, draft: &MessageDraft) -> Result<OutboundMessage, EmailError>;

    /// Creates a message from a draft and attaches a single file to it.
    ///
    /// # Arguments
    /// * `draft` - The [`MessageDraft`] to compose.
    /// * `file_content` - The raw bytes of the file.
    /// * `file_name` - The name the recipient sees.
    fn create_message_with_attachment(
        &self,
        draft: &MessageDraft,
        file_content: &[u8],
        file_name: &str,
    ) -> Result<OutboundMessage, EmailError>;
}

#[cfg(test)]
mock! {
    pub MessageBuilder {}

    impl Clone for MessageBuilder {
        fn clone(&self) -> Self;
    }

    impl MessageBuilder for MessageBuilder {
        fn create_message(&self, draft: &MessageDraft) -> Result<OutboundMessage, EmailError>;
        fn create_message_with_attachment(
            &self,
            draft: &MessageDraft,
            file_content: &[u8],
            file_name: &str,
        ) -> Result<OutboundMessage, EmailError>;
    }
}


/// Message builder implementation
#[derive(Debug)]
pub struct MessageBuilderImpl<R, E>
where
    R: TemplateRenderer,
    E: EnvironmentProbe,
{
    renderer: Arc<R>,
    environment: Arc<E>,
    always_template_emails: bool,
    add_environment_suffix: bool,
}

impl<R, E> Clone for MessageBuilderImpl<R, E>
where
    R: TemplateRenderer,
    E: EnvironmentProbe,
{
    fn clone(&self) -> Self {
        Self {
            renderer: Arc::clone(&self.renderer),
            environment: Arc::clone(&self.environment),
            always_template_emails: self.always_template_emails,
            add_environment_suffix: self.add_environment_suffix,
        }
    }
}

impl<R, E> MessageBuilderImpl<R, E>
where
    R: TemplateRenderer,
    E: EnvironmentProbe,
{
    /// Creates a new message builder.
    pub fn new(options: &DispatchOptions, renderer: Arc<R>, environment: Arc<E>) -> Self {
        Self {
            renderer,
            environment,
            always_template_emails: options.always_template_emails,
            add_environment_suffix: options.add_environment_suffix,
        }
    }

    fn render(
        &self,
        subject: &str,
        body_html: &str,
        template: Option<&str>,
    ) -> Result<String, EmailError> {
        match TemplateChoice::select(self.always_template_emails, template).template_name() {
            Some(name) => {
                debug!(template = name, "rendering email body");

                Ok(self.renderer.build_email_content(subject, body_html, name)?)
            }
            None => Ok(body_html.to_string()),
        }
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, EmailError> {
    if value.is_empty() {
        return Err(EmailError::InvalidArgument(field));
    }

    Ok(value)
}

fn address(raw: &str, field: &'static str) -> Result<EmailAddress, EmailError> {
    EmailAddress::new(raw).map_err(|source| EmailError::InvalidAddress { field, source })
}

impl<R, E> MessageBuilder for MessageBuilderImpl<R, E>
where
    R: TemplateRenderer,
    E: EnvironmentProbe,
{
    fn create_message(&self, draft: &MessageDraft) -> Result<OutboundMessage, EmailError> {
        let from = required(&draft.from, "from")?;
        let to = required(&draft.to, "to")?;
        let subject = required(&draft.subject, "subject")?;
        let body_html = required(&draft.body_html, "body_html")?;

        let from = NamedAddress::new(address(from, "from")?, draft.from_name.as_deref());

        let mut recipients = vec![address(to, "to")?];

        for item in &draft.cc {
            match EmailAddress::new(item) {
                Ok(cc) => recipients.push(cc),
                Err(err) => {
                    warn!(error = %err, address = %item, "unable to add address to email copy list")
                }
            }
        }

        let suffix = environment_suffix(self.add_environment_suffix, self.environment.as_ref());

        let subject = match suffix {
            Some(suffix) => format!("{subject}{suffix}"),
            None => subject.to_string(),
        };

        let html_body = self.render(&subject, body_html, draft.template_name.as_deref())?;
        let plain_body = strip_tags(&html_body).into_owned();

        let message = if recipients.len() == 1 {
            OutboundMessage::single(from, recipients.remove(0), subject, plain_body, html_body)
        } else {
            OutboundMessage::multiple(from, recipients, subject, plain_body, html_body)
        };

        Ok(message)
    }

    fn create_message_with_attachment(
        &self,
        draft: &MessageDraft,
        file_content: &[u8],
        file_name: &str,
    ) -> Result<OutboundMessage, EmailError> {
        let mut message = self.create_message(draft)?;

        message.attach(Attachment::new(file_content, file_name));

        Ok(message)
    }
}

#[cfg(test)]
mod builder_tests {
    use testresult::TestResult;

    use crate::domain::communication::{
        environment::tests::MockEnvironmentProbe, errors::TemplateError,
        message::Recipients, templates::tests::MockTemplateRenderer,
    };

    use super::*;

    fn environment(name: &str, production: bool) -> MockEnvironmentProbe {
        let mut environment = MockEnvironmentProbe::new();

        environment.expect_is_production().return_const(production);
        environment.expect_name().return_const(name.to_string());

        environment
    }

    fn builder(
        always_template_emails: bool,
        add_environment_suffix: bool,
        renderer: MockTemplateRenderer,
        environment: MockEnvironmentProbe,
    ) -> MessageBuilderImpl<MockTemplateRenderer, MockEnvironmentProbe> {
        let options = DispatchOptions {
            always_template_emails,
            add_environment_suffix,
            ..Default::default()
        };

        MessageBuilderImpl::new(&options, Arc::new(renderer), Arc::new(environment))
    }

    fn plain_builder() -> MessageBuilderImpl<MockTemplateRenderer, MockEnvironmentProbe> {
        builder(
            false,
            false,
            MockTemplateRenderer::new(),
            environment("Production", true),
        )
    }

    fn draft() -> MessageDraft {
        MessageDraft {
            from: "admin@test.com".to_string(),
            from_name: Some("John Smith".to_string()),
            to: "tester@test.com".to_string(),
            subject: "Test".to_string(),
            body_html: "<p>Hi</p>".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_message_single_recipient() -> TestResult {
        let message = plain_builder().create_message(&draft())?;

        assert_eq!(message.from.email.as_str(), "admin@test.com");
        assert_eq!(message.from.name.as_deref(), Some("John Smith"));
        assert_eq!(
            message.recipients,
            Recipients::Single(EmailAddress::new("tester@test.com")?)
        );
        assert_eq!(message.subject, "Test");
        assert_eq!(message.html_body, "<p>Hi</p>");
        assert_eq!(message.plain_body, "Hi");
        assert!(message.reply_to.is_none());
        assert!(message.attachment.is_none());

        Ok(())
    }

    #[test]
    fn test_create_message_without_from_name() -> TestResult {
        let draft = MessageDraft {
            from_name: Some(String::new()),
            ..draft()
        };

        let message = plain_builder().create_message(&draft)?;

        assert!(message.from.name.is_none());

        Ok(())
    }

    #[test]
    fn test_create_message_requires_mandatory_fields() {
        let cases: [(&str, fn(&mut MessageDraft)); 4] = [
            ("from", |d| d.from.clear()),
            ("to", |d| d.to.clear()),
            ("subject", |d| d.subject.clear()),
            ("body_html", |d| d.body_html.clear()),
        ];

        for (field, clear) in cases {
            let mut draft = draft();
            clear(&mut draft);

            let result = plain_builder().create_message(&draft);

            assert!(
                matches!(result, Err(EmailError::InvalidArgument(f)) if f == field),
                "expected {field} to be required"
            );
        }
    }

    #[test]
    fn test_create_message_with_malformed_to_fails() {
        let draft = MessageDraft {
            to: "not-an-email".to_string(),
            ..draft()
        };

        let result = plain_builder().create_message(&draft);

        assert!(matches!(
            result,
            Err(EmailError::InvalidAddress { field: "to", .. })
        ));
    }

    #[test]
    fn test_create_message_skips_malformed_cc() -> TestResult {
        let draft = MessageDraft {
            cc: vec!["person1@test.com".to_string(), "not-an-email".to_string()],
            ..draft()
        };

        let message = plain_builder().create_message(&draft)?;

        assert_eq!(
            message.recipients,
            Recipients::Multiple(vec![
                EmailAddress::new("tester@test.com")?,
                EmailAddress::new("person1@test.com")?,
            ])
        );

        Ok(())
    }

    #[test]
    fn test_create_message_with_only_malformed_cc_is_single() -> TestResult {
        let draft = MessageDraft {
            cc: vec!["not-an-email".to_string(), String::new()],
            ..draft()
        };

        let message = plain_builder().create_message(&draft)?;

        assert!(!message.recipients.is_multiple());

        Ok(())
    }

    #[test]
    fn test_single_and_multiple_share_content() -> TestResult {
        let single = plain_builder().create_message(&draft())?;
        let multiple = plain_builder().create_message(&MessageDraft {
            cc: vec!["person1@test.com".to_string()],
            ..draft()
        })?;

        assert!(!single.recipients.is_multiple());
        assert!(multiple.recipients.is_multiple());
        assert_eq!(single.from, multiple.from);
        assert_eq!(single.subject, multiple.subject);
        assert_eq!(single.html_body, multiple.html_body);
        assert_eq!(single.plain_body, multiple.plain_body);

        Ok(())
    }

    #[test]
    fn test_environment_suffix_outside_production() -> TestResult {
        let builder = builder(
            false,
            true,
            MockTemplateRenderer::new(),
            environment("Staging", false),
        );

        let message = builder.create_message(&draft())?;

        assert_eq!(message.subject, "Test (Staging)");

        Ok(())
    }

    #[test]
    fn test_no_environment_suffix_in_production() -> TestResult {
        for add_suffix in [true, false] {
            let builder = builder(
                false,
                add_suffix,
                MockTemplateRenderer::new(),
                environment("Production", true),
            );

            let message = builder.create_message(&draft())?;

            assert_eq!(message.subject, "Test");
        }

        Ok(())
    }

    #[test]
    fn test_no_environment_suffix_when_disabled() -> TestResult {
        let builder = builder(
            false,
            false,
            MockTemplateRenderer::new(),
            environment("Staging", false),
        );

        assert_eq!(builder.create_message(&draft())?.subject, "Test");

        Ok(())
    }

    #[test]
    fn test_always_template_uses_default_template() -> TestResult {
        let mut renderer = MockTemplateRenderer::new();

        renderer
            .expect_build_email_content()
            .times(1)
            .withf(|subject: &str, body: &str, name: &str| {
                subject == "Test (Staging)" && body == "<p>Hi</p>" && name == DEFAULT_TEMPLATE
            })
            .returning(|subject, body, _| Ok(format!("<h1>{subject}</h1>{body}")));

        let builder = builder(true, true, renderer, environment("Staging", false));

        let message = builder.create_message(&draft())?;

        assert_eq!(message.html_body, "<h1>Test (Staging)</h1><p>Hi</p>");
        assert_eq!(message.plain_body, "Test (Staging)Hi");

        Ok(())
    }

    #[test]
    fn test_named_template_overrides_default() -> TestResult {
        let mut renderer = MockTemplateRenderer::new();

        renderer
            .expect_build_email_content()
            .times(1)
            .withf(|_: &str, _: &str, name: &str| name == "Receipt")
            .returning(|_, body, _| Ok(format!("<div>{body}</div>")));

        let builder = builder(true, false, renderer, environment("Production", true));

        let message = builder.create_message(&MessageDraft {
            template_name: Some("Receipt".to_string()),
            ..draft()
        })?;

        assert_eq!(message.html_body, "<div><p>Hi</p></div>");

        Ok(())
    }

    #[test]
    fn test_named_template_applies_without_always_template() -> TestResult {
        let mut renderer = MockTemplateRenderer::new();

        renderer
            .expect_build_email_content()
            .times(1)
            .withf(|_: &str, _: &str, name: &str| name == "Receipt")
            .returning(|_, _, _| Ok("<div>Receipt</div>".to_string()));

        let builder = builder(false, false, renderer, environment("Production", true));

        let message = builder.create_message(&MessageDraft {
            template_name: Some("Receipt".to_string()),
            ..draft()
        })?;

        assert_eq!(message.html_body, "<div>Receipt</div>");
        assert_eq!(message.plain_body, "Receipt");

        Ok(())
    }

    #[test]
    fn test_template_error_is_propagated() {
        let mut renderer = MockTemplateRenderer::new();

        renderer
            .expect_build_email_content()
            .times(1)
            .returning(|_, _, name| Err(TemplateError::NotFound(name.to_string())));

        let builder = builder(false, false, renderer, environment("Production", true));

        let result = builder.create_message(&MessageDraft {
            template_name: Some("Missing".to_string()),
            ..draft()
        });

        assert!(matches!(
            result,
            Err(EmailError::Template(TemplateError::NotFound(_)))
        ));
    }

    #[test]
    fn test_create_message_with_attachment() -> TestResult {
        let message =
            plain_builder().create_message_with_attachment(&draft(), b"Testing", "test.txt")?;

        let attachment = message.attachment.expect("attachment");

        assert_eq!(attachment.content, "VGVzdGluZw==");
        assert_eq!(attachment.filename, "test.txt");
        assert_eq!(attachment.disposition, "attachment");
        assert_eq!(message.subject, "Test");

        Ok(())
    }

    #[test]
    fn test_create_message_with_attachment_validates_like_create_message() {
        let draft = MessageDraft {
            subject: String::new(),
            ..draft()
        };

        let result =
            plain_builder().create_message_with_attachment(&draft, b"Testing", "test.txt");

        assert!(matches!(result, Err(EmailError::InvalidArgument("subject"))));
    }

    #[test]
    fn test_template_choice_table() {
        assert_eq!(TemplateChoice::select(true, None), TemplateChoice::Default);
        assert_eq!(TemplateChoice::select(true, Some("")), TemplateChoice::Default);
        assert_eq!(TemplateChoice::select(true, Some("A")), TemplateChoice::Named("A"));
        assert_eq!(TemplateChoice::select(false, Some("A")), TemplateChoice::Named("A"));
        assert_eq!(TemplateChoice::select(false, None), TemplateChoice::Untemplated);
        assert_eq!(TemplateChoice::select(false, Some("")), TemplateChoice::Untemplated);
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>Hi</p>"), "Hi");
        assert_eq!(
            strip_tags("<p class=\"x\">Fish &amp; <b>chips</b></p>\n<br/>"),
            "Fish &amp; chips\n"
        );
        assert_eq!(strip_tags("no tags"), "no tags");
    }
}
