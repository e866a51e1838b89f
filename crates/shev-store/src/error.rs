//! Error types for the event store.

use shev_env::EnvError;
use shev_topology::TopologyError;
use shev_types::{Field, ParseFieldError};

/// Errors returned by an [`crate::IndexClient`].
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The request could not be sent or its response could not be read.
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// A request or response body was not the expected JSON.
    #[error("invalid backend JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The endpoint URL could not be parsed.
    #[error("invalid backend endpoint '{0}'")]
    InvalidEndpoint(String),
}

/// Which half of an insert failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    /// Building or writing the document.
    Write,
    /// Making the written document visible to searches.
    Flush,
}

impl std::fmt::Display for WriteStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Write => "write",
            Self::Flush => "flush",
        })
    }
}

/// Errors returned by searches.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// A term or match map named a field that events do not have.
    #[error(transparent)]
    UnknownField(#[from] ParseFieldError),

    /// A term or match map named the same field twice, possibly with
    /// different casing.
    #[error("event field '{0}' given more than once")]
    DuplicateField(Field),

    /// A raw query body was not valid JSON.
    #[error("malformed raw query: {0}")]
    MalformedRaw(#[source] serde_json::Error),

    /// The search call itself failed.
    #[error("search failed: {0}")]
    Backend(#[from] BackendError),

    /// A hit could not be decoded as an event.
    #[error("could not decode search hit: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Errors returned by [`crate::Store`] construction, lifecycle, and inserts.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The environment could not be mapped to a usable endpoint.
    #[error(transparent)]
    Configuration(#[from] EnvError),

    /// The backend client could not be constructed.
    #[error("could not connect to backend: {0}")]
    Connection(#[source] BackendError),

    /// The index did not exist and could not be created.
    ///
    /// `source` is `None` when the backend answered but did not acknowledge
    /// the creation.
    #[error("could not create index '{index}'")]
    IndexCreationFailed {
        index: String,
        #[source]
        source: Option<BackendError>,
    },

    /// The index could not be deleted.
    #[error("could not delete index '{index}'")]
    IndexDeletionFailed {
        index: String,
        #[source]
        source: BackendError,
    },

    /// An insert failed. A written but unflushed document counts as failed.
    #[error("insert failed at {stage}")]
    WriteFailed {
        stage: WriteStage,
        #[source]
        source: BackendError,
    },

    /// A search failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The session location could not be discovered.
    #[error(transparent)]
    Topology(#[from] TopologyError),
}
