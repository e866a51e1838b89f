use std::time::Duration;

use shev_topology::{MemoryDirectory, Placement, TopologyError, TopologyLocator, CLUSTERS_ROOT};

fn fleet() -> MemoryDirectory {
    let mut dir = MemoryDirectory::new();
    for cluster in ["blue", "green", "red"] {
        for rack in ["r01", "r02"] {
            dir.insert_host(cluster, rack, &format!("{cluster}-{rack}-node"));
        }
    }
    dir.insert_host("red", "r02", "laptop");
    dir
}

fn racks_prefix(cluster: &str) -> String {
    format!("{CLUSTERS_ROOT}{cluster}/racks/")
}

fn hosts_prefix(cluster: &str, rack: &str) -> String {
    format!("{CLUSTERS_ROOT}{cluster}/racks/{rack}/hosts/")
}

#[test]
fn rack_listing_failure_is_retried_once() {
    let dir = fleet();
    dir.fail_listing(racks_prefix("red"), 1);

    let placement = TopologyLocator::new(&dir)
        .with_backoff(Duration::ZERO)
        .locate("laptop")
        .expect("retry should recover");

    assert_eq!(
        placement,
        Placement {
            cluster: "red".into(),
            rack: "r02".into(),
            host: "laptop".into(),
        }
    );
    assert_eq!(dir.listings(&racks_prefix("red")), 2);
}

#[test]
fn cluster_is_skipped_when_rack_listing_keeps_failing() {
    let dir = fleet();
    dir.fail_listing(racks_prefix("red"), 2);

    let err = TopologyLocator::new(&dir)
        .with_backoff(Duration::ZERO)
        .locate("laptop")
        .unwrap_err();

    assert!(matches!(err, TopologyError::NotFound(ref h) if h == "laptop"));
    // The scan carried on past the failing cluster.
    assert_eq!(dir.listings(&racks_prefix("blue")), 1);
    assert_eq!(dir.listings(&racks_prefix("green")), 1);
}

#[test]
fn host_listing_failure_abandons_cluster_without_retry() {
    let dir = fleet();
    dir.fail_listing(hosts_prefix("red", "r01"), 1);

    let err = TopologyLocator::new(&dir)
        .with_backoff(Duration::ZERO)
        .locate("laptop")
        .unwrap_err();

    assert!(matches!(err, TopologyError::NotFound(_)));
    assert_eq!(dir.listings(&hosts_prefix("red", "r01")), 1);
    assert_eq!(dir.listings(&hosts_prefix("red", "r02")), 0);
}

#[test]
fn other_clusters_still_resolve_after_failures() {
    let dir = fleet();
    dir.fail_listing(racks_prefix("blue"), 5);

    let placement = TopologyLocator::new(&dir)
        .with_backoff(Duration::ZERO)
        .locate("green-r02")
        .expect("locate");

    assert_eq!(placement.cluster, "green");
    assert_eq!(placement.rack, "r02");
}

#[test]
fn exhausted_tree_is_not_found() {
    let dir = fleet();
    let err = TopologyLocator::new(&dir).locate("mainframe").unwrap_err();
    assert_eq!(err.to_string(), "could not find host 'mainframe'");
}
