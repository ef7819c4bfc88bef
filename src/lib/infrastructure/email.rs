//! Email delivery providers

pub mod sendgrid;
