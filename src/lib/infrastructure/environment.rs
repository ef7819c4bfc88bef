//! Host environment

use clap::Parser;

use crate::domain::communication::environment::EnvironmentProbe;

/// The name of the production environment
pub const PRODUCTION: &str = "Production";

/// Environment configuration
#[derive(Clone, Debug, Parser)]
pub struct EnvironmentConfig {
    /// The name of the environment the process runs in
    #[clap(long = "environment", env = "APP_ENVIRONMENT", default_value = PRODUCTION)]
    pub name: String,
}

/// The environment named by configuration
#[derive(Clone, Debug)]
pub struct HostEnvironment {
    name: String,
}

impl HostEnvironment {
    /// Create a host environment with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl From<EnvironmentConfig> for HostEnvironment {
    fn from(config: EnvironmentConfig) -> Self {
        Self::new(config.name)
    }
}

impl EnvironmentProbe for HostEnvironment {
    fn is_production(&self) -> bool {
        self.name.eq_ignore_ascii_case(PRODUCTION)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
