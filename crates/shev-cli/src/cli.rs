//! Command-line argument structures.

use clap::{Args, Parser, Subcommand};
use shev_store::{EventType, Field};

/// Tag, store, and search infrastructure events
#[derive(Debug, Parser)]
#[command(name = "shev")]
#[command(about = "shev - tag, store, and search infrastructure events", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to $SHEV_CONFIG_PATH, then shev.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the environment and backend endpoint a cluster maps to
    #[command(name = "env")]
    Env {
        /// Cluster name
        cluster: String,
    },

    /// Find the cluster and rack a host belongs to
    #[command(name = "locate")]
    Locate {
        /// Host to look up (defaults to this machine)
        hostname: Option<String>,
    },

    /// Insert the sample fleet into a backend
    #[command(name = "seed")]
    Seed {
        #[command(flatten)]
        target: Target,

        /// Only seed these clusters
        #[arg(long = "only", value_name = "CLUSTER")]
        clusters: Vec<String>,
    },

    /// Search events, oldest first
    #[command(name = "search")]
    Search {
        #[command(flatten)]
        target: Target,

        #[command(flatten)]
        filter: SearchFilter,

        /// Query body passed to the backend verbatim; other filters are ignored
        #[arg(long, value_name = "JSON")]
        raw: Option<String>,

        /// Offset of the first result
        #[arg(long, default_value = "0")]
        from: usize,

        /// Maximum number of results
        #[arg(long, default_value = "100")]
        size: usize,
    },

    /// Delete and recreate the event index
    #[command(name = "reset")]
    Reset {
        #[command(flatten)]
        target: Target,
    },
}

/// Which backend to talk to.
#[derive(Debug, Clone, Default, Args)]
pub struct Target {
    /// Environment tag (defaults to the environment of --cluster, then the
    /// configured default)
    #[arg(short, long)]
    pub env: Option<String>,
}

/// Filters for `search`. Empty filters match everything.
#[derive(Debug, Clone, Default, Args)]
pub struct SearchFilter {
    #[arg(long)]
    pub cluster: Option<String>,

    #[arg(long)]
    pub rack: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub component: Option<String>,

    /// Event type: Service, Task, Volume, Network, or Etc
    #[arg(long = "type", value_name = "TYPE")]
    pub kind: Option<EventType>,

    /// Workload id
    #[arg(long)]
    pub id: Option<String>,

    /// Workload name
    #[arg(long)]
    pub name: Option<String>,

    /// Exact condition, repeatable
    #[arg(long, value_name = "FIELD=VALUE", value_parser = parse_condition)]
    pub term: Vec<(Field, String)>,

    /// Full-text condition, repeatable
    #[arg(long = "match", value_name = "FIELD=TEXT", value_parser = parse_condition)]
    pub matching: Vec<(Field, String)>,
}

fn parse_condition(arg: &str) -> Result<(Field, String), String> {
    let (field, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{arg}'"))?;
    let field = field.trim().parse::<Field>().map_err(|e| e.to_string())?;
    Ok((field, value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_filters() {
        let cli = Cli::try_parse_from([
            "shev",
            "search",
            "--env",
            "test",
            "--cluster",
            "red",
            "--type",
            "Task",
            "--term",
            "Ref=cafe",
            "--match",
            "msg=Fat Baby",
            "--size",
            "5",
        ])
        .expect("parse");

        let Commands::Search {
            target,
            filter,
            raw,
            from,
            size,
        } = cli.command
        else {
            panic!("expected search");
        };
        assert_eq!(target.env.as_deref(), Some("test"));
        assert_eq!(filter.cluster.as_deref(), Some("red"));
        assert_eq!(filter.kind, Some(EventType::Task));
        assert_eq!(filter.term, vec![(Field::Ref, "cafe".to_string())]);
        assert_eq!(filter.matching, vec![(Field::Msg, "Fat Baby".to_string())]);
        assert!(raw.is_none());
        assert_eq!((from, size), (0, 5));
    }

    #[test]
    fn rejects_unknown_condition_field() {
        let err = Cli::try_parse_from(["shev", "search", "--term", "ServiceName=blog"]).unwrap_err();
        assert!(err.to_string().contains("unknown event field"));
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from(["shev", "locate", "laptop", "-vv", "--config", "x.toml"])
            .expect("parse");
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref(), Some("x.toml"));
        assert!(matches!(
            cli.command,
            Commands::Locate { hostname: Some(ref h) } if h == "laptop"
        ));
    }
}
