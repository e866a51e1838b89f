//! The cluster → rack → host → component hierarchy.

use serde::{Deserialize, Serialize};

use crate::Field;

/// A position in the location hierarchy.
///
/// An empty level means "unscoped" at that level. When used as a filter,
/// empty levels are left out of the query entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub cluster: String,
    pub rack: String,
    pub host: String,
    pub component: String,
}

impl Location {
    pub fn new(
        cluster: impl Into<String>,
        rack: impl Into<String>,
        host: impl Into<String>,
        component: impl Into<String>,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            rack: rack.into(),
            host: host.into(),
            component: component.into(),
        }
    }

    /// Returns the four levels outer-to-inner, paired with their field.
    pub fn levels(&self) -> [(Field, &str); 4] {
        [
            (Field::Cluster, self.cluster.as_str()),
            (Field::Rack, self.rack.as_str()),
            (Field::Host, self.host.as_str()),
            (Field::Component, self.component.as_str()),
        ]
    }

    /// True when no level is set.
    pub fn is_unscoped(&self) -> bool {
        self.levels().iter().all(|(_, value)| value.is_empty())
    }
}
