//! Query construction.
//!
//! [`EventQuery`] collects filter criteria and renders them as one
//! conjunctive `bool.must` query. Clauses always come out in the same
//! order: location levels outer-to-inner, then identity, then generic term
//! conditions, then generic match conditions. Empty values are never
//! rendered, so an empty query matches every event.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use shev_types::{EventType, Field, Location};

use crate::error::QueryError;

/// Field → value conditions keyed by validated field names.
pub type FieldMap = BTreeMap<Field, String>;

/// Validates string field names into a [`FieldMap`].
///
/// Names are matched case-insensitively against the canonical fields, so
/// `Cluster` and `cluster` are the same key and may not both appear.
///
/// # Errors
///
/// Returns `QueryError::UnknownField` for the first name that is not a
/// canonical field and `QueryError::DuplicateField` for the first field
/// named twice.
pub fn field_map<I, K, V>(pairs: I) -> Result<FieldMap, QueryError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut map = FieldMap::new();
    for (key, value) in pairs {
        let field = key.as_ref().parse::<Field>()?;
        if map.insert(field, value.into()).is_some() {
            return Err(QueryError::DuplicateField(field));
        }
    }
    Ok(map)
}

/// Builder for a conjunctive event query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    location: Location,
    kind: Option<EventType>,
    id: String,
    name: String,
    terms: FieldMap,
    matches: FieldMap,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters on every non-empty level of `location`.
    pub fn location(mut self, location: &Location) -> Self {
        self.location = location.clone();
        self
    }

    pub fn cluster(mut self, cluster: impl Into<String>) -> Self {
        self.location.cluster = cluster.into();
        self
    }

    pub fn rack(mut self, rack: impl Into<String>) -> Self {
        self.location.rack = rack.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.location.host = host.into();
        self
    }

    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.location.component = component.into();
        self
    }

    pub fn kind(mut self, kind: EventType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Service identity. The type clause is always rendered.
    pub fn service(self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.kind(EventType::Service).id(id).name(name)
    }

    /// Task identity. The type clause is always rendered.
    pub fn task(self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.kind(EventType::Task).id(id).name(name)
    }

    /// Adds an exact-match condition.
    pub fn term(mut self, field: Field, value: impl Into<String>) -> Self {
        self.terms.insert(field, value.into());
        self
    }

    /// Adds a full-text condition.
    pub fn matching(mut self, field: Field, text: impl Into<String>) -> Self {
        self.matches.insert(field, text.into());
        self
    }

    pub fn terms(mut self, terms: FieldMap) -> Self {
        self.terms.extend(terms);
        self
    }

    pub fn matches(mut self, matches: FieldMap) -> Self {
        self.matches.extend(matches);
        self
    }

    /// Renders the `must` clauses in their fixed order.
    pub fn clauses(&self) -> Vec<Value> {
        let mut clauses = Vec::new();

        for (field, value) in self.location.levels() {
            if !value.is_empty() {
                clauses.push(term(field, value));
            }
        }

        if let Some(kind) = self.kind {
            clauses.push(term(Field::Type, kind.as_str()));
        }
        if !self.id.is_empty() {
            clauses.push(term(Field::Id, &self.id));
        }
        if !self.name.is_empty() {
            clauses.push(term(Field::Name, &self.name));
        }

        for (field, value) in &self.terms {
            clauses.push(term(*field, value));
        }
        for (field, text) in &self.matches {
            clauses.push(predicate("match", *field, text));
        }

        clauses
    }

    /// Renders the backend query body.
    pub fn to_query(&self) -> Value {
        json!({ "bool": { "must": self.clauses() } })
    }
}

fn term(field: Field, value: &str) -> Value {
    predicate("term", field, value)
}

/// `{ kind: { field: value } }`
fn predicate(kind: &str, field: Field, value: &str) -> Value {
    let mut condition = Map::new();
    condition.insert(field.as_str().to_string(), Value::String(value.to_string()));
    let mut clause = Map::new();
    clause.insert(kind.to_string(), Value::Object(condition));
    Value::Object(clause)
}

/// Parses a caller-supplied query body without interpreting it.
///
/// # Errors
///
/// Returns `QueryError::MalformedRaw` if the body is not JSON.
pub fn raw(body: &str) -> Result<Value, QueryError> {
    serde_json::from_str(body).map_err(QueryError::MalformedRaw)
}
