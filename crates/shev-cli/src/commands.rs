//! Subcommand execution.

use std::io::Write;

use shev_env::{EnvConfig, EnvError};
use shev_store::{
    ElasticClient, Event, EventQuery, IndexClient, Location, QueryError, Store, StoreError,
    StoreOptions,
};
use shev_topology::{ConsulDirectory, Directory, DirectoryError, TopologyError, TopologyLocator};
use thiserror::Error;

use crate::cli::{Cli, Commands, SearchFilter, Target};
use crate::config::Config;
use crate::demo::{self, Fleet};

/// Errors surfaced to the command line.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("failed to reach directory: {0}")]
    Directory(#[from] DirectoryError),

    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Runs one parsed command, writing results to `out`.
///
/// # Errors
///
/// Returns the first error of the command; nothing is retried here.
pub fn run(cli: Cli, config: &Config, out: &mut impl Write) -> Result<(), CliError> {
    match cli.command {
        Commands::Env { cluster } => {
            let (env, endpoint) = config.environments.endpoint_for_cluster(&cluster)?;
            writeln!(out, "{cluster}\t{env}\t{endpoint}")?;
        }
        Commands::Locate { hostname } => {
            let mut directory =
                ConsulDirectory::new(&config.directory.address, Some(config.backend.timeout()))?;
            if let Some(token) = &config.directory.token {
                directory = directory.with_token(token);
            }
            let locator =
                TopologyLocator::new(directory).with_backoff(config.directory.backoff());
            let found = locate(&config.environments, hostname, &locator)?;
            writeln!(
                out,
                "{}\t{}\t{}\t{}",
                found.location.cluster, found.location.rack, found.location.host, found.env
            )?;
        }
        Commands::Seed { target, clusters } => {
            let mut store = connect(config, &target, None)?;
            let fleet = Fleet::sample().only_clusters(&clusters);
            let inserted = demo::seed(&mut store, &fleet)?;
            writeln!(out, "inserted {inserted} events")?;
        }
        Commands::Search {
            target,
            filter,
            raw,
            from,
            size,
        } => {
            let store = connect(config, &target, filter.cluster.as_deref())?;
            let events = search(&store, &filter, raw.as_deref(), from, size)?;
            print_events(out, &events)?;
        }
        Commands::Reset { target } => {
            let store = connect(config, &target, None)?;
            store.reset()?;
            writeln!(out, "index reset")?;
        }
    }
    Ok(())
}

/// Places `hostname` (this machine when `None`) and resolves its
/// environment.
pub fn locate<D: Directory>(
    environments: &EnvConfig,
    hostname: Option<String>,
    locator: &TopologyLocator<D>,
) -> Result<StoreOptions, StoreError> {
    let options = StoreOptions {
        location: Location {
            host: hostname.unwrap_or_default(),
            ..Location::default()
        },
        ..StoreOptions::default()
    };
    options.discover(environments, locator)
}

/// Picks the environment: explicit flag, then the cluster's environment,
/// then the configured default.
pub fn select_env(environments: &EnvConfig, target: &Target, cluster: Option<&str>) -> String {
    if let Some(env) = target.env.as_deref().filter(|env| !env.is_empty()) {
        return env.to_string();
    }
    match cluster.filter(|cluster| !cluster.is_empty()) {
        Some(cluster) => environments.resolve(cluster).to_string(),
        None => environments.default_env.clone(),
    }
}

fn connect(
    config: &Config,
    target: &Target,
    cluster: Option<&str>,
) -> Result<Store<ElasticClient>, StoreError> {
    let env = select_env(&config.environments, target, cluster);
    Store::connect_env(&config.environments, &env, Some(config.backend.timeout()))
}

/// Renders the filter flags as a query.
pub fn build_query(filter: &SearchFilter) -> EventQuery {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();

    let mut query = EventQuery::new()
        .cluster(text(&filter.cluster))
        .rack(text(&filter.rack))
        .host(text(&filter.host))
        .component(text(&filter.component))
        .id(text(&filter.id))
        .name(text(&filter.name));
    if let Some(kind) = filter.kind {
        query = query.kind(kind);
    }
    for (field, value) in &filter.term {
        query = query.term(*field, value.as_str());
    }
    for (field, text) in &filter.matching {
        query = query.matching(*field, text.as_str());
    }
    query
}

/// Runs `raw` verbatim when given, otherwise the query built from `filter`.
pub fn search<C: IndexClient>(
    store: &Store<C>,
    filter: &SearchFilter,
    raw: Option<&str>,
    from: usize,
    size: usize,
) -> Result<Vec<Event>, QueryError> {
    match raw {
        Some(body) => store.search_by_raw(body, from, size),
        None => store.search(&build_query(filter), from, size),
    }
}

/// One JSON document per line.
pub fn print_events(out: &mut impl Write, events: &[Event]) -> Result<(), CliError> {
    for event in events {
        serde_json::to_writer(&mut *out, event)?;
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use shev_store::{EventType, Field, MemoryIndex};
    use shev_topology::MemoryDirectory;

    fn seeded() -> Store<MemoryIndex> {
        let mut store = Store::open(MemoryIndex::new()).expect("open");
        store.update_location(Location::new("red", "r01", "laptop", "linux"));
        store
            .insert_with_service(&serde_json::json!({ "Nick": "Fat Baby" }), "", "blog")
            .expect("insert");
        store
            .insert_with_task(&serde_json::json!({ "Nick": "Milky Way" }), "", "blog.1", "blog")
            .expect("insert");
        store.update_location(Location::new("blue", "r02", "tablet", "mac"));
        store
            .insert_with_service(&serde_json::json!({ "Nick": "Little Girl" }), "", "cafe")
            .expect("insert");
        store
    }

    #[test]
    fn locate_reports_placement_and_env() {
        let mut dir = MemoryDirectory::new();
        dir.insert_host("pxr1", "r02", "db-03");
        let locator = TopologyLocator::new(&dir);

        let found = locate(&EnvConfig::default(), Some("db-03".to_string()), &locator)
            .expect("locate");
        assert_eq!(found.location, Location::new("pxr1", "r02", "db-03", ""));
        assert_eq!(found.env, "real");

        let err = locate(&EnvConfig::default(), Some("gone".to_string()), &locator).unwrap_err();
        assert!(matches!(err, StoreError::Topology(TopologyError::NotFound(_))));
    }

    #[test]
    fn env_selection_order() {
        let environments = EnvConfig::default();
        let explicit = Target {
            env: Some("real".to_string()),
        };
        let none = Target::default();

        assert_eq!(select_env(&environments, &explicit, Some("dpd1")), "real");
        assert_eq!(select_env(&environments, &none, Some("dpd1")), "test");
        assert_eq!(select_env(&environments, &none, Some("ppr2")), "real");
        assert_eq!(select_env(&environments, &none, Some("")), "test");
        assert_eq!(select_env(&environments, &none, None), environments.default_env);
    }

    #[test]
    fn filter_flags_become_query_clauses() {
        let filter = SearchFilter {
            cluster: Some("red".to_string()),
            kind: Some(EventType::Task),
            name: Some("blog.1".to_string()),
            matching: vec![(Field::Msg, "Milky".to_string())],
            ..SearchFilter::default()
        };
        assert_eq!(
            build_query(&filter),
            EventQuery::new()
                .cluster("red")
                .task("", "blog.1")
                .matching(Field::Msg, "Milky")
        );
    }

    #[test]
    fn search_uses_filters_or_raw_body() {
        let store = seeded();
        let filter = SearchFilter {
            cluster: Some("red".to_string()),
            kind: Some(EventType::Service),
            ..SearchFilter::default()
        };

        let by_filter = search(&store, &filter, None, 0, 10).expect("filter");
        assert_eq!(by_filter.len(), 1);
        assert_eq!(by_filter[0].name, "blog");

        let raw = r#"{ "term": { "cluster": "blue" } }"#;
        let by_raw = search(&store, &filter, Some(raw), 0, 10).expect("raw");
        assert_eq!(by_raw.len(), 1);
        assert_eq!(by_raw[0].name, "cafe");
    }

    #[test]
    fn events_print_as_json_lines() {
        let store = seeded();
        let events = search(&store, &SearchFilter::default(), None, 0, 10).expect("search");

        let mut out = Vec::new();
        print_events(&mut out, &events).expect("print");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        let first: serde_json::Value = serde_json::from_str(lines[0]).expect("json");
        assert_eq!(first["type"], "Service");
        assert_eq!(first["cluster"], "red");
    }

    #[test]
    fn env_command_prints_resolution() {
        let cli = Cli::try_parse_from(["shev", "env", "ppr2"]).expect("parse");
        let mut out = Vec::new();
        run(cli, &Config::default(), &mut out).expect("run");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "ppr2\treal\thttp://shev-real:9200\n"
        );
    }

    #[test]
    fn env_command_reports_missing_endpoint() {
        let mut config = Config::default();
        config.environments.endpoints.remove("real");

        let cli = Cli::try_parse_from(["shev", "env", "ppr2"]).expect("parse");
        let err = run(cli, &config, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, CliError::Env(_)));
    }
}
