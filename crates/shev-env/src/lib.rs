//! Environment resolution for the Shev event store.
//!
//! Every cluster belongs to one backend environment (`real`, `dev` or
//! `test`), and every environment is served by one search backend endpoint.
//! [`EnvConfig`] carries both tables. It is built once, deserialized from
//! the `[environments]` section of the config file or taken from
//! [`EnvConfig::default`], and never mutated afterwards.
//!
//! # Resolution order
//!
//! 1. An explicit entry in the cluster table always wins.
//! 2. Otherwise a name shaped like `ppr2` (three lower-case letters and a
//!    digit) is classified by its third letter: `r` is `real`, `d` is `dev`,
//!    anything else is `test`.
//! 3. Any other name falls back to the configured default environment.

mod config;
mod error;
mod resolver;

pub use config::{EnvConfig, ENV_DEFAULT, ENV_DEV, ENV_REAL, ENV_TEST};
pub use error::EnvError;
