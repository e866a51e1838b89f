//! Sample fleet for exercising a backend by hand.

use serde::Serialize;
use shev_store::{IndexClient, Location, Store, StoreError};

/// One content payload per event.
#[derive(Debug, Clone, Serialize)]
pub struct Sample {
    #[serde(rename = "Nick")]
    pub nick: String,
}

/// Locations and workloads to seed.
///
/// Every (cluster, rack, host, component) combination receives one event
/// per content for each service, and one per content for each task under
/// the service its name starts with.
#[derive(Debug, Clone)]
pub struct Fleet {
    pub clusters: Vec<String>,
    pub racks: Vec<String>,
    pub hosts: Vec<String>,
    pub components: Vec<String>,
    pub contents: Vec<Sample>,
    pub services: Vec<String>,
    pub tasks: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Fleet {
    pub fn sample() -> Self {
        Self {
            clusters: owned(&["red", "blue", "green"]),
            racks: owned(&["r01", "r02"]),
            hosts: owned(&["laptop", "desktop", "tablet", "cellphone"]),
            components: owned(&["windows", "mac", "linux"]),
            contents: ["Milky Way", "Little Girl", "Fat Baby"]
                .into_iter()
                .map(|nick| Sample {
                    nick: nick.to_string(),
                })
                .collect(),
            services: owned(&["cafe", "blog", "search"]),
            tasks: owned(&["cafe.1", "cafe.2", "blog.1", "blog.2", "blog.3", "search.1"]),
        }
    }

    /// Restricts the fleet to the given clusters. An empty list keeps all.
    pub fn only_clusters(mut self, clusters: &[String]) -> Self {
        if !clusters.is_empty() {
            self.clusters = clusters.to_vec();
        }
        self
    }

    fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        self.clusters.iter().flat_map(move |cluster| {
            self.racks.iter().flat_map(move |rack| {
                self.hosts.iter().flat_map(move |host| {
                    self.components
                        .iter()
                        .map(move |component| Location::new(cluster, rack, host, component))
                })
            })
        })
    }

    /// Services owning `task`, by name prefix.
    fn owners<'a>(&'a self, task: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.services
            .iter()
            .filter(move |service| task.starts_with(service.as_str()))
    }
}

/// Inserts the whole fleet through `store` and returns the event count.
///
/// The store's location is left at the last seeded location.
///
/// # Errors
///
/// Stops at the first failed insert.
pub fn seed<C: IndexClient>(store: &mut Store<C>, fleet: &Fleet) -> Result<usize, StoreError> {
    let mut inserted = 0;

    for location in fleet.locations() {
        store.update_location(location);

        for service in &fleet.services {
            for content in &fleet.contents {
                store.insert_with_service(content, "", service)?;
                inserted += 1;
            }
        }

        for task in &fleet.tasks {
            for service in fleet.owners(task) {
                for content in &fleet.contents {
                    store.insert_with_task(content, "", task, service)?;
                    inserted += 1;
                }
            }
        }
    }

    tracing::info!(inserted, clusters = fleet.clusters.len(), "seeded sample fleet");
    Ok(inserted)
}
