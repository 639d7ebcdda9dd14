//! `stash` subcommands.

use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use serde::Serialize;
use stash_core::{CacheConfig, CacheStore, CleanMode};

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Print the live value stored under KEY.
    Get {
        key: String,
        /// Printed instead when KEY has no live value.
        #[arg(long)]
        default: Option<String>,
    },
    /// Store VALUE under KEY.
    Set {
        key: String,
        value: String,
        /// Lifetime in seconds (defaults to the configured lifetime).
        #[arg(long, allow_negative_numbers = true)]
        lifetime: Option<i64>,
    },
    /// Print whether KEY has a live value.
    Has { key: String },
    /// Remove KEY, live or not.
    Rm { key: String },
    /// Remove every key matching a glob pattern (`*` is the wildcard).
    RmPattern { pattern: String },
    /// Remove expired entries, or everything with --all.
    Clean {
        #[arg(long)]
        all: bool,
    },
    /// Print the expiry timestamp of KEY (0 if none live).
    Ttl { key: String },
    /// Print the last-modified timestamp of KEY (0 if none live).
    Mtime { key: String },
    /// Print live values for several keys as a JSON object.
    GetMany {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Print store statistics as JSON.
    Stats,
}

/// Result of a command, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The requested key had no live value.
    Missing,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Done => ExitCode::SUCCESS,
            Outcome::Missing => ExitCode::from(1),
        }
    }
}

#[derive(Debug, Serialize)]
struct Stats {
    backend: String,
    database: Option<String>,
    automatic_cleaning_factor: u32,
    lifetime: i64,
    entries: u64,
}

/// Run `command` against `store`, writing results to `out`.
pub async fn execute(
    store: &dyn CacheStore, config: &CacheConfig, command: Command, out: &mut impl Write,
) -> Result<Outcome> {
    match command {
        Command::Get { key, default } => match (store.get(&key).await?, default) {
            (Some(value), _) | (None, Some(value)) => {
                writeln!(out, "{value}")?;
                Ok(Outcome::Done)
            }
            (None, None) => Ok(Outcome::Missing),
        },
        Command::Set { key, value, lifetime } => {
            store.set(&key, &value, lifetime).await?;
            Ok(Outcome::Done)
        }
        Command::Has { key } => {
            let live = store.has(&key).await?;
            writeln!(out, "{live}")?;
            Ok(if live { Outcome::Done } else { Outcome::Missing })
        }
        Command::Rm { key } => {
            let removed = store.remove(&key).await?;
            writeln!(out, "{removed}")?;
            Ok(Outcome::Done)
        }
        Command::RmPattern { pattern } => {
            let removed = store.remove_pattern(&pattern).await?;
            writeln!(out, "{removed}")?;
            Ok(Outcome::Done)
        }
        Command::Clean { all } => {
            let mode = if all { CleanMode::All } else { CleanMode::Old };
            store.clean(mode).await?;
            Ok(Outcome::Done)
        }
        Command::Ttl { key } => {
            writeln!(out, "{}", store.get_timeout(&key).await?)?;
            Ok(Outcome::Done)
        }
        Command::Mtime { key } => {
            writeln!(out, "{}", store.get_last_modified(&key).await?)?;
            Ok(Outcome::Done)
        }
        Command::GetMany { keys } => {
            let found = store.get_many(&keys).await?;
            let json = serde_json::to_string_pretty(&found).context("serializing entries")?;
            writeln!(out, "{json}")?;
            Ok(Outcome::Done)
        }
        Command::Stats => {
            let stats = Stats {
                backend: config.backend.clone(),
                database: config.database.as_ref().map(|p| p.display().to_string()),
                automatic_cleaning_factor: config.automatic_cleaning_factor,
                lifetime: config.lifetime,
                entries: store.entry_count().await?,
            };
            let json = serde_json::to_string_pretty(&stats).context("serializing stats")?;
            writeln!(out, "{json}")?;
            Ok(Outcome::Done)
        }
    }
}
