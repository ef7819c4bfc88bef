//! Composition and dispatch of transactional email

pub mod dispatch;
pub mod email_addresses;
pub mod environment;
pub mod errors;
pub mod message;
pub mod message_builder;
pub mod options;
pub mod templates;
pub mod transport;
