//! Email templating

#[cfg(test)]
use mockall::mock;

use crate::domain::communication::errors::TemplateError;

/// Name of the template applied when templating is always on
pub const DEFAULT_TEMPLATE: &str = "default";

/// Renders a subject and body into final HTML
pub trait TemplateRenderer: Send + Sync + 'static {
    /// Renders `body` into the template named `template_name`.
    ///
    /// # Arguments
    /// * `subject` - The final subject of the email.
    /// * `body` - The HTML body supplied by the caller.
    /// * `template_name` - The template to render into.
    ///
    /// # Returns
    /// The rendered HTML, or a [`TemplateError`] if the template does not exist
    /// or fails to render.
    fn build_email_content(
        &self,
        subject: &str,
        body: &str,
        template_name: &str,
    ) -> Result<String, TemplateError>;
}

#[cfg(test)]
mock! {
    pub TemplateRenderer {}

    impl TemplateRenderer for TemplateRenderer {
        fn build_email_content(
            &self,
            subject: &str,
            body: &str,
            template_name: &str,
        ) -> Result<String, TemplateError>;
    }
}
