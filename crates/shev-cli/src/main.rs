//! Shev binary: parses arguments, loads configuration, and runs one command.

use std::process::ExitCode;

use clap::Parser;
use shev_cli::{load_config, run, Cli};
use tracing_subscriber::EnvFilter;

fn resolve_config_path(cli: &Cli) -> (String, &'static str) {
    if let Some(path) = cli.config.as_ref().filter(|p| !p.trim().is_empty()) {
        return (path.clone(), "cli-arg");
    }

    if let Ok(path) = std::env::var("SHEV_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (path, "env-var");
        }
    }

    ("shev.toml".to_string(), "default")
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (config_path, config_source) = resolve_config_path(&cli);

    let config = match load_config(Some(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("shev: {e}");
            return ExitCode::FAILURE;
        }
    };

    // -v and -vv take precedence over the configured level
    let level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::debug!(
        source = config_source,
        path = %config_path,
        "resolved startup configuration path"
    );

    let stdout = std::io::stdout();
    match run(cli, &config, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("shev: {e}");
            ExitCode::FAILURE
        }
    }
}
