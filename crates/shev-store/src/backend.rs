//! The search backend capability consumed by the store.

use serde_json::Value;
use shev_types::Field;

use crate::error::BackendError;

/// One page of a sorted search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Backend-native query body.
    pub query: Value,
    pub from: usize,
    pub size: usize,
    pub sort_field: Field,
    pub ascending: bool,
}

/// Raw search results before decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    /// Document sources, in sort order.
    pub hits: Vec<Value>,
    pub took_ms: u64,
    /// Matching documents across all pages.
    pub total_hits: u64,
}

/// A client bound to the single event index.
///
/// Implementations must be safe to share between sessions on different
/// threads; each method is one blocking round trip.
pub trait IndexClient: Send + Sync {
    fn index_exists(&self) -> Result<bool, BackendError>;

    /// Creates the index and returns whether the backend acknowledged it.
    fn create_index(&self, mapping: &Value) -> Result<bool, BackendError>;

    fn delete_index(&self) -> Result<(), BackendError>;

    fn write(&self, document: &Value) -> Result<(), BackendError>;

    /// Makes every prior write visible to searches.
    fn flush(&self) -> Result<(), BackendError>;

    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError>;
}
