//! Email addresses module.

mod email_address;
mod named_address;

pub use email_address::{EmailAddress, EmailAddressError};
pub use named_address::NamedAddress;
