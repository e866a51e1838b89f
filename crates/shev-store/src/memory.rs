//! An in-process [`IndexClient`] for tests and demos.
//!
//! Evaluates the subset of the query DSL the store produces (`bool` with
//! `must`/`filter`/`must_not`, `term`, `match`, `match_all`) over documents
//! held in memory. Like the real backend, writes stay invisible to searches
//! until the next flush.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::DateTime;
use serde_json::Value;

use crate::backend::{IndexClient, SearchRequest, SearchResponse};
use crate::error::BackendError;

/// Backend operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Exists,
    Create,
    Delete,
    Write,
    Flush,
    Search,
}

#[derive(Debug, Default)]
struct Indexed {
    mapping: Value,
    visible: Vec<Value>,
    pending: Vec<Value>,
}

#[derive(Debug, Default)]
struct State {
    index: Option<Indexed>,
    failing: HashSet<Operation>,
    refuse_creation: bool,
    creations: usize,
}

/// A single in-memory index.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    state: Mutex<State>,
}

impl MemoryIndex {
    /// A backend with no index yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call of `op` fail until [`MemoryIndex::recover`].
    pub fn fail(&self, op: Operation) {
        self.lock().failing.insert(op);
    }

    pub fn recover(&self, op: Operation) {
        self.lock().failing.remove(&op);
    }

    /// When set, index creation succeeds but is not acknowledged.
    pub fn refuse_creation(&self, refuse: bool) {
        self.lock().refuse_creation = refuse;
    }

    /// How many times an index has been created.
    pub fn creations(&self) -> usize {
        self.lock().creations
    }

    /// Mapping the current index was created with.
    pub fn mapping(&self) -> Option<Value> {
        self.lock().index.as_ref().map(|index| index.mapping.clone())
    }

    /// Documents visible to searches.
    pub fn visible(&self) -> usize {
        self.lock().index.as_ref().map_or(0, |index| index.visible.len())
    }

    /// Documents written since the last flush.
    pub fn pending(&self) -> usize {
        self.lock().index.as_ref().map_or(0, |index| index.pending.len())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the state, failing if `op` has been set to fail.
    fn enter(&self, op: Operation) -> Result<MutexGuard<'_, State>, BackendError> {
        let state = self.lock();
        if state.failing.contains(&op) {
            return Err(BackendError::Status {
                status: 503,
                body: format!("injected failure: {op:?}"),
            });
        }
        Ok(state)
    }
}

fn index_not_found() -> BackendError {
    BackendError::Status {
        status: 404,
        body: "index_not_found_exception".to_string(),
    }
}

fn unsupported(query: &Value) -> BackendError {
    BackendError::Status {
        status: 400,
        body: format!("unsupported query: {query}"),
    }
}

impl IndexClient for MemoryIndex {
    fn index_exists(&self) -> Result<bool, BackendError> {
        Ok(self.enter(Operation::Exists)?.index.is_some())
    }

    fn create_index(&self, mapping: &Value) -> Result<bool, BackendError> {
        let mut state = self.enter(Operation::Create)?;
        if state.index.is_some() {
            return Err(BackendError::Status {
                status: 400,
                body: "resource_already_exists_exception".to_string(),
            });
        }
        state.index = Some(Indexed {
            mapping: mapping.clone(),
            ..Indexed::default()
        });
        state.creations += 1;
        Ok(!state.refuse_creation)
    }

    fn delete_index(&self) -> Result<(), BackendError> {
        let mut state = self.enter(Operation::Delete)?;
        state.index.take().map(|_| ()).ok_or_else(index_not_found)
    }

    fn write(&self, document: &Value) -> Result<(), BackendError> {
        let mut state = self.enter(Operation::Write)?;
        let index = state.index.as_mut().ok_or_else(index_not_found)?;
        index.pending.push(document.clone());
        Ok(())
    }

    fn flush(&self) -> Result<(), BackendError> {
        let mut state = self.enter(Operation::Flush)?;
        let index = state.index.as_mut().ok_or_else(index_not_found)?;
        let pending = std::mem::take(&mut index.pending);
        index.visible.extend(pending);
        Ok(())
    }

    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        let state = self.enter(Operation::Search)?;
        let index = state.index.as_ref().ok_or_else(index_not_found)?;

        let mut matched = Vec::new();
        for doc in &index.visible {
            if matches(&request.query, doc)? {
                matched.push(doc);
            }
        }

        let field = request.sort_field.as_str();
        matched.sort_by(|a, b| {
            let order = compare_sort_keys(a.get(field), b.get(field));
            if request.ascending {
                order
            } else {
                order.reverse()
            }
        });

        let total_hits = matched.len() as u64;
        let hits = matched
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .cloned()
            .collect();

        Ok(SearchResponse {
            hits,
            took_ms: 0,
            total_hits,
        })
    }
}

fn matches(query: &Value, doc: &Value) -> Result<bool, BackendError> {
    let Some((kind, body)) = single_entry(query) else {
        return Err(unsupported(query));
    };

    match kind {
        "match_all" => Ok(true),
        "bool" => bool_matches(body, doc),
        "term" => {
            let (field, expected) = condition(body, "value").ok_or_else(|| unsupported(query))?;
            Ok(term_matches(doc.get(field), expected))
        }
        "match" => {
            let (field, text) = condition(body, "query").ok_or_else(|| unsupported(query))?;
            Ok(text_matches(doc.get(field), text))
        }
        _ => Err(unsupported(query)),
    }
}

fn bool_matches(body: &Value, doc: &Value) -> Result<bool, BackendError> {
    let Some(sections) = body.as_object() else {
        return Err(unsupported(body));
    };

    for (section, clauses) in sections {
        let clauses = match clauses {
            Value::Array(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };
        match section.as_str() {
            "must" | "filter" => {
                for clause in clauses {
                    if !matches(clause, doc)? {
                        return Ok(false);
                    }
                }
            }
            "must_not" => {
                for clause in clauses {
                    if matches(clause, doc)? {
                        return Ok(false);
                    }
                }
            }
            _ => return Err(unsupported(body)),
        }
    }
    Ok(true)
}

fn single_entry(value: &Value) -> Option<(&str, &Value)> {
    let object = value.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object.iter().next().map(|(k, v)| (k.as_str(), v))
}

/// Reads `{ field: x }` or `{ field: { inner: x } }`.
fn condition<'a>(body: &'a Value, inner: &str) -> Option<(&'a str, &'a Value)> {
    let (field, value) = single_entry(body)?;
    match value {
        Value::Object(options) => options.get(inner).map(|v| (field, v)),
        _ => Some((field, value)),
    }
}

fn term_matches(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        Some(Value::Array(items)) => items.iter().any(|item| item == expected),
        Some(value) => value == expected,
        None => false,
    }
}

/// Any query token appearing in the field's text.
fn text_matches(actual: Option<&Value>, text: &Value) -> bool {
    let Some(actual) = actual else {
        return false;
    };

    let mut haystack = Vec::new();
    collect_text(actual, &mut haystack);
    let doc_tokens: HashSet<String> = haystack.iter().flat_map(|s| tokens(s)).collect();

    let query = match text {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let wanted: Vec<String> = tokens(&query).collect();
    wanted.iter().any(|token| doc_tokens.contains(token))
}

fn collect_text(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Array(items) => items.iter().for_each(|item| collect_text(item, out)),
        Value::Object(fields) => fields.values().for_each(|item| collect_text(item, out)),
        Value::Null => {}
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

/// Dates compare chronologically at millisecond precision, the resolution
/// of a `date` field; everything else by its string form. Ties keep write
/// order.
fn compare_sort_keys(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn date(value: Option<&Value>) -> Option<i64> {
        value
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.timestamp_millis())
    }

    match (date(a), date(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => {
            let text = |v: Option<&Value>| v.map(Value::to_string).unwrap_or_default();
            text(a).cmp(&text(b))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shev_types::Field;

    fn request(query: Value) -> SearchRequest {
        SearchRequest {
            query,
            from: 0,
            size: 100,
            sort_field: Field::Created,
            ascending: true,
        }
    }

    fn seeded() -> MemoryIndex {
        let index = MemoryIndex::new();
        index.create_index(&json!({})).expect("create");
        for (cluster, created, msg) in [
            ("red", "2024-01-01T00:00:02Z", "{\"Nick\":\"Fat Baby\"}"),
            ("blue", "2024-01-01T00:00:01.5Z", "{\"Nick\":\"Milky Way\"}"),
            ("red", "2024-01-01T00:00:01Z", "{\"Nick\":\"Little Girl\"}"),
        ] {
            index
                .write(&json!({ "cluster": cluster, "created": created, "msg": msg }))
                .expect("write");
        }
        index.flush().expect("flush");
        index
    }

    #[test]
    fn writes_are_invisible_until_flush() {
        let index = MemoryIndex::new();
        index.create_index(&json!({})).expect("create");
        index.write(&json!({ "cluster": "red" })).expect("write");

        let found = index.search(&request(json!({ "match_all": {} }))).expect("search");
        assert!(found.hits.is_empty());
        assert_eq!(index.pending(), 1);

        index.flush().expect("flush");
        let found = index.search(&request(json!({ "match_all": {} }))).expect("search");
        assert_eq!(found.total_hits, 1);
    }

    #[test]
    fn sorts_by_created_chronologically() {
        let index = seeded();
        let found = index.search(&request(json!({ "match_all": {} }))).expect("search");
        let order: Vec<&str> = found
            .hits
            .iter()
            .map(|h| h["created"].as_str().unwrap_or_default())
            .collect();
        assert_eq!(
            order,
            vec![
                "2024-01-01T00:00:01Z",
                "2024-01-01T00:00:01.5Z",
                "2024-01-01T00:00:02Z"
            ]
        );
    }

    #[test]
    fn same_millisecond_keeps_write_order() {
        let index = MemoryIndex::new();
        index.create_index(&json!({})).expect("create");
        for (name, created) in [
            ("first", "2024-01-01T00:00:01.000900Z"),
            ("second", "2024-01-01T00:00:01.000100Z"),
            ("third", "2024-01-01T00:00:00.999999Z"),
        ] {
            index
                .write(&json!({ "name": name, "created": created }))
                .expect("write");
        }
        index.flush().expect("flush");

        let found = index.search(&request(json!({ "match_all": {} }))).expect("search");
        let names: Vec<&str> = found
            .hits
            .iter()
            .map(|h| h["name"].as_str().unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["third", "first", "second"]);
    }

    #[test]
    fn bool_term_and_match() {
        let index = seeded();
        let query = json!({
            "bool": { "must": [
                { "term": { "cluster": "red" } },
                { "match": { "msg": "baby" } }
            ] }
        });
        let found = index.search(&request(query)).expect("search");
        assert_eq!(found.total_hits, 1);
        assert_eq!(found.hits[0]["created"], "2024-01-01T00:00:02Z");
    }

    #[test]
    fn term_accepts_value_object() {
        let index = seeded();
        let query = json!({ "term": { "cluster": { "value": "blue" } } });
        assert_eq!(index.search(&request(query)).expect("search").total_hits, 1);
    }

    #[test]
    fn pagination_reports_full_total() {
        let index = seeded();
        let mut req = request(json!({ "bool": { "must": [] } }));
        req.from = 1;
        req.size = 1;
        let found = index.search(&req).expect("search");
        assert_eq!(found.total_hits, 3);
        assert_eq!(found.hits.len(), 1);
    }

    #[test]
    fn unsupported_query_is_rejected() {
        let index = seeded();
        let err = index
            .search(&request(json!({ "fuzzy": { "cluster": "rad" } })))
            .unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 400, .. }));
    }

    #[test]
    fn missing_index_and_injected_failures() {
        let index = MemoryIndex::new();
        assert!(!index.index_exists().expect("exists"));
        assert!(index.delete_index().is_err());
        assert!(index.write(&json!({})).is_err());

        index.fail(Operation::Exists);
        assert!(index.index_exists().is_err());
        index.recover(Operation::Exists);
        assert!(index.index_exists().is_ok());
    }
}
