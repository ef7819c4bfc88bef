//! Concrete collaborators for the communication domain

pub mod email;
pub mod environment;
pub mod templates;
