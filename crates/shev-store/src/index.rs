//! Index lifecycle: existence check, idempotent creation, and reset.
//!
//! The mapping is fixed. A schema change means a new [`INDEX`] name, not a
//! migration of the existing index.

use serde_json::{json, Value};
use shev_types::{Field, INDEX};

use crate::backend::IndexClient;
use crate::error::StoreError;

/// The canonical mapping for the event index.
pub fn mapping() -> Value {
    let keyword = json!({ "type": "keyword" });
    let mut properties = serde_json::Map::new();
    for field in Field::ALL {
        let property = match field {
            Field::Msg => json!({ "type": "object" }),
            Field::Created => json!({ "type": "date" }),
            _ => keyword.clone(),
        };
        properties.insert(field.as_str().to_string(), property);
    }

    json!({ "mappings": { "properties": properties } })
}

/// Checks whether the event index exists.
///
/// # Errors
///
/// Returns `StoreError::IndexCreationFailed` if the check itself fails,
/// since no caller can proceed without knowing.
pub fn exists<C: IndexClient + ?Sized>(client: &C) -> Result<bool, StoreError> {
    client.index_exists().map_err(|e| {
        tracing::error!(index = INDEX, error = %e, "failed to check index");
        StoreError::IndexCreationFailed {
            index: INDEX.to_string(),
            source: Some(e),
        }
    })
}

/// Creates the event index with the canonical mapping.
///
/// # Errors
///
/// Returns `StoreError::IndexCreationFailed` if the call fails or the
/// backend does not acknowledge the creation.
pub fn create<C: IndexClient + ?Sized>(client: &C) -> Result<(), StoreError> {
    let acknowledged = client.create_index(&mapping()).map_err(|e| {
        tracing::error!(index = INDEX, error = %e, "failed to create index");
        StoreError::IndexCreationFailed {
            index: INDEX.to_string(),
            source: Some(e),
        }
    })?;

    if !acknowledged {
        tracing::error!(index = INDEX, "index creation not acknowledged");
        return Err(StoreError::IndexCreationFailed {
            index: INDEX.to_string(),
            source: None,
        });
    }

    tracing::info!(index = INDEX, "created index");
    Ok(())
}

/// Deletes the event index and every event in it.
///
/// # Errors
///
/// Returns `StoreError::IndexDeletionFailed` if the backend call fails.
pub fn delete<C: IndexClient + ?Sized>(client: &C) -> Result<(), StoreError> {
    client.delete_index().map_err(|e| {
        tracing::error!(index = INDEX, error = %e, "failed to delete index");
        StoreError::IndexDeletionFailed {
            index: INDEX.to_string(),
            source: e,
        }
    })?;
    tracing::info!(index = INDEX, "deleted index");
    Ok(())
}

/// Creates the event index unless it already exists.
///
/// # Errors
///
/// Returns `StoreError::IndexCreationFailed` if the existence check or the
/// creation fails.
pub fn ensure_ready<C: IndexClient + ?Sized>(client: &C) -> Result<(), StoreError> {
    if exists(client)? {
        tracing::debug!(index = INDEX, "index already exists");
        return Ok(());
    }
    create(client)
}

/// Deletes and recreates the event index.
///
/// Not atomic: if creation fails after a successful delete the index is
/// left absent. An absent index is not deleted again, so retrying `reset`
/// or calling [`ensure_ready`] restores it.
///
/// # Errors
///
/// Returns `StoreError::IndexDeletionFailed` or
/// `StoreError::IndexCreationFailed` for the step that failed.
pub fn reset<C: IndexClient + ?Sized>(client: &C) -> Result<(), StoreError> {
    if exists(client)? {
        delete(client)?;
    } else {
        tracing::warn!(index = INDEX, "index already absent, recreating");
    }
    create(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryIndex, Operation};

    #[test]
    fn mapping_types() {
        let mapping = mapping();
        let props = &mapping["mappings"]["properties"];
        for field in ["cluster", "rack", "host", "component"] {
            assert_eq!(props[field]["type"], "keyword", "{field}");
        }
        assert_eq!(props["msg"]["type"], "object");
        assert_eq!(props["created"]["type"], "date");
        assert_eq!(props["name"]["type"], "keyword");
    }

    #[test]
    fn ensure_ready_is_idempotent() {
        let backend = MemoryIndex::new();
        ensure_ready(&backend).expect("first");
        ensure_ready(&backend).expect("second");
        assert_eq!(backend.creations(), 1);
        assert_eq!(backend.mapping(), Some(mapping()));
    }

    #[test]
    fn unacknowledged_creation_fails() {
        let backend = MemoryIndex::new();
        backend.refuse_creation(true);
        let err = ensure_ready(&backend).unwrap_err();
        assert!(matches!(
            err,
            StoreError::IndexCreationFailed { source: None, .. }
        ));
    }

    #[test]
    fn failed_existence_check_is_a_creation_failure() {
        let backend = MemoryIndex::new();
        backend.fail(Operation::Exists);
        assert!(matches!(
            ensure_ready(&backend),
            Err(StoreError::IndexCreationFailed { source: Some(_), .. })
        ));
    }

    #[test]
    fn reset_reports_the_failing_step() {
        let backend = MemoryIndex::new();
        ensure_ready(&backend).expect("ready");

        backend.fail(Operation::Delete);
        assert!(matches!(
            reset(&backend),
            Err(StoreError::IndexDeletionFailed { .. })
        ));
        assert!(exists(&backend).expect("exists"));
        backend.recover(Operation::Delete);

        backend.fail(Operation::Create);
        assert!(matches!(
            reset(&backend),
            Err(StoreError::IndexCreationFailed { .. })
        ));
        // The delete went through; the index is gone until the next attempt.
        assert!(!exists(&backend).expect("exists"));
    }

    #[test]
    fn retried_reset_recovers_after_failed_creation() {
        let backend = MemoryIndex::new();
        ensure_ready(&backend).expect("ready");

        backend.fail(Operation::Create);
        assert!(reset(&backend).is_err());
        backend.recover(Operation::Create);

        reset(&backend).expect("retry");
        assert!(exists(&backend).expect("exists"));
        assert_eq!(backend.creations(), 2);
    }

    #[test]
    fn reset_creates_a_missing_index() {
        let backend = MemoryIndex::new();
        reset(&backend).expect("reset");
        assert!(exists(&backend).expect("exists"));
        assert_eq!(backend.mapping(), Some(mapping()));
    }
}
