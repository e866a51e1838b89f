//! Environment tables and their defaults.

use std::collections::BTreeMap;

use serde::Deserialize;

pub const ENV_TEST: &str = "test";
pub const ENV_DEV: &str = "dev";
pub const ENV_REAL: &str = "real";
pub const ENV_DEFAULT: &str = ENV_TEST;

/// Cluster → environment and environment → endpoint tables.
///
/// Each table given in a config file replaces the built-in table as a
/// whole; tables are not merged entry by entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnvConfig {
    /// Environment used when a cluster name matches neither the table nor
    /// the naming convention.
    #[serde(default = "default_env")]
    pub default_env: String,

    /// Explicit cluster → environment overrides.
    #[serde(default = "default_clusters")]
    pub clusters: BTreeMap<String, String>,

    /// Environment → search backend endpoint URL.
    #[serde(default = "default_endpoints")]
    pub endpoints: BTreeMap<String, String>,
}

fn default_env() -> String {
    ENV_DEFAULT.to_string()
}

fn default_clusters() -> BTreeMap<String, String> {
    [
        ("build", ENV_DEV),
        ("dpd1", ENV_TEST),
        ("dpd2", ENV_TEST),
        ("edu", ENV_TEST),
        ("exp", ENV_TEST),
        ("ksd1", ENV_TEST),
        ("pcd1", ENV_DEV),
        ("pcr1", ENV_REAL),
        ("play", ENV_TEST),
        ("ppr1", ENV_REAL),
        ("ppr2", ENV_REAL),
        ("ppr3", ENV_REAL),
        ("test", ENV_DEV),
        ("pxr1", ENV_REAL),
        ("pxr2", ENV_REAL),
    ]
    .into_iter()
    .map(|(cluster, env)| (cluster.to_string(), env.to_string()))
    .collect()
}

fn default_endpoints() -> BTreeMap<String, String> {
    [
        (ENV_TEST, "http://localhost:9200"),
        (ENV_DEV, "http://shev-dev:9200"),
        (ENV_REAL, "http://shev-real:9200"),
    ]
    .into_iter()
    .map(|(env, url)| (env.to_string(), url.to_string()))
    .collect()
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            default_env: default_env(),
            clusters: default_clusters(),
            endpoints: default_endpoints(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_section_uses_builtin_tables() {
        let config: EnvConfig = toml::from_str("").expect("parse");
        assert_eq!(config, EnvConfig::default());
        assert_eq!(config.clusters.get("ppr2").map(String::as_str), Some(ENV_REAL));
    }

    #[test]
    fn configured_table_replaces_builtin_table() {
        let config: EnvConfig = toml::from_str(
            r#"
            default_env = "dev"

            [clusters]
            red = "real"
            "#,
        )
        .expect("parse");

        assert_eq!(config.default_env, ENV_DEV);
        assert_eq!(config.clusters.len(), 1);
        assert_eq!(config.endpoints, default_endpoints());
    }
}
