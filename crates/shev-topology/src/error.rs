//! Error types for topology discovery.

/// Errors returned by a [`crate::Directory`] listing.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("directory request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The directory answered with a non-success status.
    #[error("directory returned status {status} for '{prefix}'")]
    Status { status: u16, prefix: String },

    /// The listing body was not a JSON array of keys.
    #[error("directory listing for '{prefix}' is malformed: {source}")]
    Decode {
        prefix: String,
        #[source]
        source: serde_json::Error,
    },

    /// A listing failure injected by [`crate::MemoryDirectory`].
    #[error("directory listing unavailable for '{0}'")]
    Unavailable(String),
}

/// Errors returned by [`crate::TopologyLocator`].
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// No host key under any cluster and rack matched the hostname.
    #[error("could not find host '{0}'")]
    NotFound(String),

    /// The cluster root itself could not be listed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The local hostname could not be determined.
    #[error("could not get hostname: {0}")]
    Hostname(#[source] std::io::Error),
}
