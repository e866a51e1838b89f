//! Topology discovery for the Shev event store.
//!
//! A host's cluster and rack are not configured locally; they are recorded
//! in a hierarchical key-value directory laid out as
//!
//! ```text
//! shipdock/clusters/<cluster>/racks/<rack>/hosts/<host>
//! ```
//!
//! [`TopologyLocator`] scans that tree for a hostname. The directory itself
//! is reached through the [`Directory`] trait: [`ConsulDirectory`] talks to
//! a Consul agent over HTTP and [`MemoryDirectory`] holds a fixed key set
//! for tests and demos.
//!
//! # Usage
//!
//! ```rust,ignore
//! use shev_topology::{ConsulDirectory, TopologyLocator};
//!
//! let directory = ConsulDirectory::new("http://127.0.0.1:8500", None)?;
//! let placement = TopologyLocator::new(directory).locate("laptop")?;
//! println!("{} / {}", placement.cluster, placement.rack);
//! ```

mod consul;
mod directory;
mod error;
mod locator;

pub use consul::{ConsulDirectory, DEFAULT_CONSUL_ADDRESS};
pub use directory::{Directory, MemoryDirectory};
pub use error::{DirectoryError, TopologyError};
pub use locator::{local_hostname, Placement, TopologyLocator, CLUSTERS_ROOT};
