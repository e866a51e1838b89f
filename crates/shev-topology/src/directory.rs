//! The directory capability and an in-memory implementation.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

use crate::error::DirectoryError;

/// A hierarchical key-value directory that can list keys by prefix.
pub trait Directory: Send + Sync {
    /// Lists the keys directly below `prefix`.
    ///
    /// Keys deeper than one `delimiter` past the prefix are collapsed to
    /// their first level, which then ends with the delimiter.
    fn list_keys(&self, prefix: &str, delimiter: &str) -> Result<Vec<String>, DirectoryError>;
}

impl<D: Directory + ?Sized> Directory for &D {
    fn list_keys(&self, prefix: &str, delimiter: &str) -> Result<Vec<String>, DirectoryError> {
        (**self).list_keys(prefix, delimiter)
    }
}

/// A directory backed by a fixed set of keys.
///
/// Listings follow the same collapsing rules as a Consul `?keys&separator=`
/// query. Failures can be injected per prefix to exercise error handling.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    keys: BTreeSet<String>,
    failures: Mutex<HashMap<String, usize>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the full key path for a host.
    pub fn insert_host(&mut self, cluster: &str, rack: &str, host: &str) {
        self.keys.insert(format!(
            "{}{cluster}/racks/{rack}/hosts/{host}",
            crate::CLUSTERS_ROOT
        ));
    }

    /// Adds an arbitrary key.
    pub fn insert_key(&mut self, key: impl Into<String>) {
        self.keys.insert(key.into());
    }

    /// Makes the next `times` listings of exactly `prefix` fail.
    pub fn fail_listing(&self, prefix: impl Into<String>, times: usize) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(prefix.into(), times);
    }

    /// Returns how many times `prefix` has been listed.
    pub fn listings(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(prefix)
            .copied()
            .unwrap_or(0)
    }
}

impl Directory for MemoryDirectory {
    fn list_keys(&self, prefix: &str, delimiter: &str) -> Result<Vec<String>, DirectoryError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(prefix.to_string())
            .or_default() += 1;

        {
            let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(remaining) = failures.get_mut(prefix) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(DirectoryError::Unavailable(prefix.to_string()));
                }
            }
        }

        let mut listed = BTreeSet::new();
        for key in self.keys.range(prefix.to_string()..) {
            let Some(rest) = key.strip_prefix(prefix) else {
                break;
            };
            let entry = match (delimiter.is_empty(), rest.find(delimiter)) {
                (false, Some(pos)) => &key[..prefix.len() + pos + delimiter.len()],
                _ => key.as_str(),
            };
            listed.insert(entry.to_string());
        }

        Ok(listed.into_iter().collect())
    }
}
