//! Host → (cluster, rack) discovery by scanning the directory tree.

use std::thread;
use std::time::Duration;

use crate::directory::Directory;
use crate::error::{DirectoryError, TopologyError};

/// Root of the cluster tree in the directory.
pub const CLUSTERS_ROOT: &str = "shipdock/clusters/";

const DELIMITER: &str = "/";
const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Where a host lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub cluster: String,
    pub rack: String,
    /// The directory's name for the matched host.
    pub host: String,
}

/// Finds the cluster and rack that own a host.
///
/// The scan visits clusters, then their racks, then each rack's hosts, in
/// the order the directory lists them. It costs one listing per cluster
/// and per rack, so it is meant for one-off lookups at startup.
#[derive(Debug)]
pub struct TopologyLocator<D> {
    directory: D,
    root: String,
    backoff: Duration,
}

impl<D: Directory> TopologyLocator<D> {
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            root: CLUSTERS_ROOT.to_string(),
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Scans a different cluster root. Must end with `/`.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Pause before retrying a failed rack listing.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Returns the first placement whose host key contains `hostname`.
    ///
    /// Matching is by substring against the whole listed host key, so
    /// `laptop` also matches a host registered as `laptop-02`, and a name
    /// that only appears in the cluster or rack part of the key matches the
    /// first host listed under it.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError::Directory` if the cluster root cannot be
    /// listed and `TopologyError::NotFound` once every rack has been
    /// scanned without a match. Listing failures below the root are logged
    /// and the affected subtree is skipped.
    pub fn locate(&self, hostname: &str) -> Result<Placement, TopologyError> {
        if hostname.is_empty() {
            return Err(TopologyError::NotFound(String::new()));
        }

        let clusters = self.directory.list_keys(&self.root, DELIMITER).map_err(|e| {
            tracing::error!(prefix = %self.root, error = %e, "failed to list clusters");
            e
        })?;

        for cluster_key in &clusters {
            let Some(racks) = self.list_racks(cluster_key) else {
                continue;
            };

            for rack_key in &racks {
                let hosts_prefix = format!("{rack_key}hosts/");
                let hosts = match self.directory.list_keys(&hosts_prefix, DELIMITER) {
                    Ok(hosts) => hosts,
                    Err(e) => {
                        tracing::error!(prefix = %hosts_prefix, error = %e, "failed to list hosts");
                        break;
                    }
                };

                if let Some(host_key) = hosts.iter().find(|key| key.contains(hostname)) {
                    let placement = Placement {
                        cluster: last_segment(cluster_key).to_string(),
                        rack: last_segment(rack_key).to_string(),
                        host: last_segment(host_key).to_string(),
                    };
                    tracing::debug!(path = %host_key, "found host");
                    return Ok(placement);
                }
            }
        }

        Err(TopologyError::NotFound(hostname.to_string()))
    }

    /// Locates a host and logs where it lives.
    pub fn describe(&self, hostname: &str) -> Result<Placement, TopologyError> {
        let placement = self.locate(hostname)?;
        tracing::info!(
            hostname,
            cluster = %placement.cluster,
            rack = %placement.rack,
            "found host placement"
        );
        Ok(placement)
    }

    /// Lists a cluster's racks, retrying once after the backoff.
    ///
    /// Returns `None` when both attempts fail; the cluster is then skipped.
    fn list_racks(&self, cluster_key: &str) -> Option<Vec<String>> {
        let prefix = format!("{cluster_key}racks/");
        let first = match self.directory.list_keys(&prefix, DELIMITER) {
            Ok(racks) => return Some(racks),
            Err(e) => e,
        };

        tracing::warn!(prefix = %prefix, error = %first, "failed to list racks, retrying");
        thread::sleep(self.backoff);

        match self.directory.list_keys(&prefix, DELIMITER) {
            Ok(racks) => Some(racks),
            Err(e) => {
                log_skipped(&prefix, &e);
                None
            }
        }
    }
}

fn log_skipped(prefix: &str, error: &DirectoryError) {
    tracing::error!(prefix, error = %error, "failed to list racks, skipping cluster");
}

/// `a/b/c/` and `a/b/c` both yield `c`.
fn last_segment(key: &str) -> &str {
    key.trim_end_matches(DELIMITER)
        .rsplit(DELIMITER)
        .next()
        .unwrap_or(key)
}

/// Returns this machine's hostname.
///
/// # Errors
///
/// Returns `TopologyError::Hostname` if the name cannot be read or is not
/// valid UTF-8.
pub fn local_hostname() -> Result<String, TopologyError> {
    let name = hostname::get().map_err(TopologyError::Hostname)?;
    name.into_string().map_err(|raw| {
        TopologyError::Hostname(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("hostname is not valid UTF-8: {raw:?}"),
        ))
    })
}
