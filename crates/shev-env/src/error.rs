//! Error types for environment resolution.

/// Errors raised while turning an environment tag into a backend endpoint.
///
/// These are configuration mistakes. They are reported at construction
/// time and never retried.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnvError {
    /// No environment tag was supplied.
    #[error("environment should not be empty")]
    MissingEnvironment,

    /// The environment tag has no endpoint entry.
    #[error("could not recognize environment '{0}'")]
    UnknownEnvironment(String),

    /// The environment tag maps to an empty endpoint.
    #[error("endpoint for environment '{0}' is empty")]
    EmptyEndpoint(String),
}
