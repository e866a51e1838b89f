//! Command-line front end for the Shev event store.
//!
//! The `shev` binary resolves environments, locates hosts in the topology
//! directory, seeds a backend with a sample fleet, searches events, and
//! resets the index. Everything except argument parsing and logging setup
//! lives here so it can be driven from tests.

pub mod cli;
pub mod commands;
pub mod config;
pub mod demo;

pub use cli::Cli;
pub use commands::{run, CliError};
pub use config::{load_config, Config, ConfigError};
