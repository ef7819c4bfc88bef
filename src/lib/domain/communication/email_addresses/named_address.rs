//! Named email address

use std::fmt;

use super::EmailAddress;

/// An email address with an optional display name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedAddress {
    /// The email address
    pub email: EmailAddress,

    /// The display name, never empty when present
    pub name: Option<String>,
}

impl NamedAddress {
    /// Creates a named address, attaching `name` only if it is non-empty.
    pub fn new(email: EmailAddress, name: Option<&str>) -> Self {
        Self {
            email,
            name: name.filter(|name| !name.is_empty()).map(str::to_string),
        }
    }
}

impl fmt::Display for NamedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => write!(f, "{}", self.email),
        }
    }
}
