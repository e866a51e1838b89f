//! Cluster name → environment → endpoint.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{EnvConfig, ENV_DEV, ENV_REAL, ENV_TEST};
use crate::error::EnvError;

static CLUSTER_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{3}[0-9]$").expect("cluster shape pattern is valid"));

impl EnvConfig {
    /// Returns the environment tag a cluster belongs to.
    ///
    /// Never fails: names the table does not know and the naming convention
    /// cannot classify resolve to [`EnvConfig::default_env`].
    pub fn resolve(&self, cluster: &str) -> &str {
        if let Some(env) = self.clusters.get(cluster) {
            return env.as_str();
        }

        if !CLUSTER_SHAPE.is_match(cluster) {
            return self.default_env.as_str();
        }

        match cluster.as_bytes()[2] {
            b'r' => ENV_REAL,
            b'd' => ENV_DEV,
            _ => ENV_TEST,
        }
    }

    /// Returns the backend endpoint configured for an environment tag.
    ///
    /// # Errors
    ///
    /// Returns `EnvError::MissingEnvironment` for an empty tag,
    /// `EnvError::UnknownEnvironment` when the tag has no entry, and
    /// `EnvError::EmptyEndpoint` when the entry is blank.
    pub fn endpoint(&self, env: &str) -> Result<&str, EnvError> {
        if env.is_empty() {
            tracing::error!("environment should not be empty");
            return Err(EnvError::MissingEnvironment);
        }

        let Some(address) = self.endpoints.get(env) else {
            tracing::error!(env, "could not recognize environment");
            return Err(EnvError::UnknownEnvironment(env.to_string()));
        };

        if address.trim().is_empty() {
            tracing::error!(env, "environment endpoint is empty");
            return Err(EnvError::EmptyEndpoint(env.to_string()));
        }

        Ok(address.as_str())
    }

    /// Resolves a cluster all the way to `(environment, endpoint)`.
    ///
    /// # Errors
    ///
    /// Same as [`EnvConfig::endpoint`] for the resolved environment.
    pub fn endpoint_for_cluster(&self, cluster: &str) -> Result<(&str, &str), EnvError> {
        let env = self.resolve(cluster);
        let address = self.endpoint(env)?;
        tracing::debug!(cluster, env, "resolved cluster environment");
        Ok((env, address))
    }
}
