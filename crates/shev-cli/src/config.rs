//! CLI configuration loading from file and environment variables.

use std::time::Duration;

use serde::Deserialize;
use shev_env::EnvConfig;
use shev_topology::DEFAULT_CONSUL_ADDRESS;
use thiserror::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Cluster → environment → endpoint tables.
    #[serde(default)]
    pub environments: EnvConfig,

    /// Topology directory settings.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Search backend settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Consul agent used for host placement.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// Agent base URL.
    #[serde(default = "default_directory_address")]
    pub address: String,

    /// ACL token sent with every listing.
    #[serde(default)]
    pub token: Option<String>,

    /// Pause before retrying a failed rack listing, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Per-request timeout in seconds for the backend and the directory.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "shev_store=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_directory_address() -> String {
    DEFAULT_CONSUL_ADDRESS.to_string()
}

fn default_backoff_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            address: default_directory_address(),
            token: None,
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl DirectoryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `SHEV_DEFAULT_ENV` overrides `environments.default_env`
/// - `SHEV_CONSUL_ADDRESS` overrides `directory.address`
/// - `SHEV_CONSUL_TOKEN` overrides `directory.token`
/// - `SHEV_DIRECTORY_BACKOFF_MS` overrides `directory.backoff_ms`
/// - `SHEV_BACKEND_TIMEOUT_SECS` overrides `backend.timeout_secs`
/// - `SHEV_LOG_LEVEL` overrides `logging.level`
/// - `SHEV_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies `SHEV_*` overrides read through `var`. Unparsable numbers are
/// ignored.
fn apply_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(env) = var("SHEV_DEFAULT_ENV") {
        config.environments.default_env = env;
    }
    if let Some(address) = var("SHEV_CONSUL_ADDRESS") {
        config.directory.address = address;
    }
    if let Some(token) = var("SHEV_CONSUL_TOKEN") {
        config.directory.token = Some(token);
    }
    if let Some(backoff) = var("SHEV_DIRECTORY_BACKOFF_MS") {
        if let Ok(parsed) = backoff.parse() {
            config.directory.backoff_ms = parsed;
        }
    }
    if let Some(timeout) = var("SHEV_BACKEND_TIMEOUT_SECS") {
        if let Ok(parsed) = timeout.parse() {
            config.backend.timeout_secs = parsed;
        }
    }
    if let Some(level) = var("SHEV_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("SHEV_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
