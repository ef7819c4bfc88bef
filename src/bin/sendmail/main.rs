#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! Sends a single transactional email through SendGrid

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::{error, info};
use transactional_mailer::{
    domain::communication::{
        dispatch::{EmailRequest, EmailService, EmailServiceImpl, FileAttachment, ReplyTo},
        message_builder::MessageBuilderImpl,
        options::DispatchOptions,
    },
    infrastructure::{
        email::sendgrid::{SendGridConfig, SendGridTransport},
        environment::{EnvironmentConfig, HostEnvironment},
        templates::AskamaTemplateRenderer,
    },
};

/// Command-line arguments / environment variables
#[derive(Debug, Parser)]
pub struct Args {
    /// The SendGrid configuration
    #[clap(flatten)]
    pub sendgrid: SendGridConfig,

    /// The environment configuration
    #[clap(flatten)]
    pub environment: EnvironmentConfig,

    /// The recipient, defaults to the administrator
    #[clap(long)]
    pub to: Option<String>,

    /// Copy recipients
    #[clap(long, value_delimiter = ',')]
    pub cc: Vec<String>,

    /// The subject
    #[clap(long)]
    pub subject: String,

    /// The HTML body
    #[clap(long)]
    pub body: String,

    /// Body replacements as `key=value`
    #[clap(long = "token", value_parser = parse_token)]
    pub tokens: Vec<(String, String)>,

    /// The template to render the body into
    #[clap(long)]
    pub template: Option<String>,

    /// The name of an additional API key to send with
    #[clap(long)]
    pub sender_key: Option<String>,

    /// Where replies should go
    #[clap(long, conflicts_with = "attachment")]
    pub reply_to: Option<String>,

    /// The reply-to display name
    #[clap(long, requires = "reply_to")]
    pub reply_to_name: Option<String>,

    /// A file to attach
    #[clap(long)]
    pub attachment: Option<PathBuf>,
}

fn parse_token(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got \"{raw}\""))
}

#[mutants::skip]
#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load environment: {}", e);

            return Err(e.into());
        }
    }

    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let transport = Arc::new(SendGridTransport::from_config(&args.sendgrid)?);
    let options = DispatchOptions::try_from(args.sendgrid)?;

    let builder = Arc::new(MessageBuilderImpl::new(
        &options,
        Arc::new(AskamaTemplateRenderer::new()),
        Arc::new(HostEnvironment::from(args.environment)),
    ));

    let service = EmailServiceImpl::new(options, builder, transport);

    let mut request = EmailRequest::new(
        args.to.unwrap_or_else(|| service.admin_email().to_string()),
        args.subject,
        args.body,
    )
    .cc(args.cc);

    request.tokens = args.tokens;
    request.template_name = args.template;
    request.sender_key_name = args.sender_key;

    let sent = match (args.reply_to, args.attachment) {
        (Some(address), _) => {
            let reply_to = ReplyTo::new(address, args.reply_to_name.as_deref());

            service.send_with_reply_to(&reply_to, &request).await?
        }
        (None, Some(path)) => {
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("invalid attachment path {}", path.display()))?
                .to_string();
            let content = tokio::fs::read(&path).await?;

            service
                .send_with_attachment(&FileAttachment::new(content, file_name), &request)
                .await?
        }
        (None, None) => service.send(&request).await?,
    };

    if !sent {
        error!("SendGrid did not accept the message");

        return Err(anyhow!("message was not sent"));
    }

    info!("message sent");

    Ok(())
}
