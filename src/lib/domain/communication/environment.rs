//! Runtime environment lookup

#[cfg(test)]
use mockall::mock;

/// Reports which environment the process is running in
pub trait EnvironmentProbe: Send + Sync + 'static {
    /// Whether this is the production environment
    fn is_production(&self) -> bool;

    /// The environment name, e.g. `Staging`
    fn name(&self) -> String;
}

#[cfg(test)]
mock! {
    pub EnvironmentProbe {}

    impl EnvironmentProbe for EnvironmentProbe {
        fn is_production(&self) -> bool;
        fn name(&self) -> String;
    }
}
