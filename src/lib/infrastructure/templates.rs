//! Askama email templates

use anyhow::anyhow;
use askama::Template;
use css_inline::InlineError;
use tracing::debug;

use crate::domain::communication::{
    errors::TemplateError,
    templates::{TemplateRenderer, DEFAULT_TEMPLATE},
};

/// Name of the unbranded template
pub const MINIMAL_TEMPLATE: &str = "minimal";

/// Branded layout with a header and footer
#[derive(Debug, Template)]
#[template(path = "emails/default.html")]
struct DefaultTemplate<'a> {
    subject: &'a str,
    body: &'a str,
}

/// Body only, no branding
#[derive(Debug, Template)]
#[template(path = "emails/minimal.html")]
struct MinimalTemplate<'a> {
    subject: &'a str,
    body: &'a str,
}

impl From<askama::Error> for TemplateError {
    fn from(err: askama::Error) -> Self {
        debug!("askama::Error -> TemplateError");

        TemplateError::UnknownError(anyhow!(err))
    }
}

impl From<InlineError> for TemplateError {
    fn from(err: InlineError) -> Self {
        debug!("InlineError -> TemplateError");

        TemplateError::UnknownError(anyhow!("could not inline styles: {err}"))
    }
}

/// Renders the compiled-in templates and inlines their CSS
#[derive(Debug, Default, Clone)]
pub struct AskamaTemplateRenderer;

impl AskamaTemplateRenderer {
    /// Create a new renderer
    pub fn new() -> Self {
        Self
    }
}

impl TemplateRenderer for AskamaTemplateRenderer {
    fn build_email_content(
        &self,
        subject: &str,
        body: &str,
        template_name: &str,
    ) -> Result<String, TemplateError> {
        let html = match template_name {
            DEFAULT_TEMPLATE => DefaultTemplate { subject, body }.render()?,
            MINIMAL_TEMPLATE => MinimalTemplate { subject, body }.render()?,
            other => return Err(TemplateError::NotFound(other.to_string())),
        };

        Ok(css_inline::inline(&html)?)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn test_default_template_wraps_body() -> TestResult {
        let html = AskamaTemplateRenderer::new().build_email_content(
            "Welcome",
            "<p>Hi</p>",
            DEFAULT_TEMPLATE,
        )?;

        assert!(html.contains("<p>Hi</p>"));
        assert!(html.contains("Welcome"));
        assert!(html.contains("automated system"));
        assert!(!html.contains("<style>"));

        Ok(())
    }

    #[test]
    fn test_minimal_template_has_no_branding() -> TestResult {
        let html = AskamaTemplateRenderer::new().build_email_content(
            "Welcome",
            "<p>Hi</p>",
            MINIMAL_TEMPLATE,
        )?;

        assert!(html.contains("<p>Hi</p>"));
        assert!(!html.contains("automated system"));

        Ok(())
    }

    #[test]
    fn test_unknown_template() {
        let result =
            AskamaTemplateRenderer::new().build_email_content("Welcome", "<p>Hi</p>", "Receipt");

        assert!(matches!(result, Err(TemplateError::NotFound(name)) if name == "Receipt"));
    }
}
