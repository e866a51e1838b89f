//! Shared types and constants for the Shev event store.
//!
//! This crate defines the shape of a stored event and the canonical field
//! names used both as document keys and as query predicate keys. Every
//! other crate in the workspace agrees on these names through [`Field`];
//! nothing spells a field name as a bare string literal.

use serde::{Deserialize, Serialize};

mod event;
mod location;

pub use event::{Event, Identity};
pub use location::Location;

/// Name of the single logical index holding every event.
///
/// Changing the stored mapping means changing this name and treating the
/// result as a new index.
pub const INDEX: &str = "events";

/// Schema version stamped on every event at insertion time.
pub const VERSION: &str = "0.7";

/// Canonical event field names.
///
/// The serialized form is lower-case and is identical in stored documents,
/// in the index mapping, and in query predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Version,
    Cluster,
    Rack,
    Host,
    Component,
    Type,
    Id,
    Name,
    Ref,
    Msg,
    Created,
}

impl Field {
    /// Every canonical field, in document order.
    pub const ALL: [Field; 11] = [
        Self::Version,
        Self::Cluster,
        Self::Rack,
        Self::Host,
        Self::Component,
        Self::Type,
        Self::Id,
        Self::Name,
        Self::Ref,
        Self::Msg,
        Self::Created,
    ];

    /// Returns the document key for this field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::Cluster => "cluster",
            Self::Rack => "rack",
            Self::Host => "host",
            Self::Component => "component",
            Self::Type => "type",
            Self::Id => "id",
            Self::Name => "name",
            Self::Ref => "ref",
            Self::Msg => "msg",
            Self::Created => "created",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Field {
    type Err = ParseFieldError;

    /// Accepts the document key in any letter case, so `"Cluster"` and
    /// `"cluster"` both name [`Field::Cluster`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseFieldError(s.to_string()))
    }
}

/// Error returned when a string does not name a canonical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFieldError(pub String);

impl std::fmt::Display for ParseFieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown event field: {}", self.0)
    }
}

impl std::error::Error for ParseFieldError {}

/// Kind of workload an event is about.
///
/// The kind decides which identity fields are meaningful: only
/// [`EventType::Task`] carries a `ref` to its owning service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EventType {
    Service,
    Task,
    Volume,
    Network,
    /// Anything without a workload identity.
    #[default]
    Etc,
}

impl EventType {
    /// Returns the stored label for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Service => "Service",
            Self::Task => "Task",
            Self::Volume => "Volume",
            Self::Network => "Network",
            Self::Etc => "Etc",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = ParseEventTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Service" => Ok(Self::Service),
            "Task" => Ok(Self::Task),
            "Volume" => Ok(Self::Volume),
            "Network" => Ok(Self::Network),
            "Etc" => Ok(Self::Etc),
            _ => Err(ParseEventTypeError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown event type label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEventTypeError(pub String);

impl std::fmt::Display for ParseEventTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown event type: {}", self.0)
    }
}

impl std::error::Error for ParseEventTypeError {}
