//! Event tagging and retrieval over a document search backend.
//!
//! A [`Store`] session stamps every inserted payload with its location
//! context (cluster, rack, host, component), a workload identity, the
//! schema version, and a creation timestamp, then writes and flushes it so
//! it is immediately searchable. Searches filter by any prefix of the
//! location hierarchy, by identity, by arbitrary field conditions, or by a
//! raw query body, and always return events oldest first.
//!
//! The backend is reached through [`IndexClient`]: [`ElasticClient`] speaks
//! the Elasticsearch REST API and [`MemoryIndex`] evaluates queries in
//! process.
//!
//! # Usage
//!
//! ```rust,ignore
//! use shev_store::{EventQuery, Store};
//! use shev_types::Location;
//!
//! let mut store = Store::connect_env(&env_config, "test", None)?;
//! store.update_location(Location::new("red", "r01", "laptop", "linux"));
//! store.insert_with_service(&serde_json::json!({ "Nick": "Milky Way" }), "", "blog")?;
//!
//! let events = store.search(&EventQuery::new().cluster("red").service("", "blog"), 0, 100)?;
//! ```

mod backend;
mod elastic;
mod error;
pub mod index;
mod memory;
pub mod query;
mod store;

pub use backend::{IndexClient, SearchRequest, SearchResponse};
pub use elastic::{ElasticClient, DEFAULT_TIMEOUT};
pub use error::{BackendError, QueryError, StoreError, WriteStage};
pub use memory::{MemoryIndex, Operation};
pub use query::{field_map, EventQuery, FieldMap};
pub use store::{Store, StoreOptions, DEFAULT_PAGE_SIZE};

pub use shev_types::{Event, EventType, Field, Identity, Location};
