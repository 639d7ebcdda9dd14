//! stash command-line entry point.
//!
//! Opens the configured cache and runs one operation against it.
//! Logging goes to stderr so command output on stdout stays scriptable.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use stash_core::{CacheConfig, open_store};
use tracing_subscriber::EnvFilter;

mod commands;

/// Inspect and manipulate a stash cache database.
#[derive(Debug, Parser)]
#[command(name = "stash", version)]
struct Cli {
    /// Cache database path, or ":memory:" (overrides STASH_DATABASE).
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli).await {
        Ok(outcome) => outcome.into(),
        Err(err) => {
            eprintln!("stash: error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<commands::Outcome> {
    let mut config = CacheConfig::load().context("loading configuration")?;
    if let Some(database) = cli.database {
        config.database = Some(database);
    }

    let store = open_store(&config).await.context("opening cache")?;
    tracing::debug!(backend = %config.backend, "cache opened");

    let mut out = std::io::stdout();
    commands::execute(store.as_ref(), &config, cli.command, &mut out).await
}
