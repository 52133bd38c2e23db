//! Command-line front end for the backend document store.
//!
//! # Responsibility
//! - Resolve store and logging settings from environment and flags.
//! - Own the repository lifecycle for exactly one command.
//!
//! # Invariants
//! - Store initialization failure is fatal: logged, reported, exit code 1.
//! - `--memory`/`--db` override `PANDA_DB_MEMORY`/`PANDA_DB_PATH`; the busy
//!   timeout always comes from the environment.

mod commands;

use clap::Parser;
use commands::Cli;
use log::error;
use panda_core::{
    default_log_level, init_logging, BackendRepository, DocumentBackendRepository, LogTarget,
    RepoResult, StoreConfig,
};
use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = setup_logging(&cli) {
        eprintln!("panda: {err}");
        return ExitCode::FAILURE;
    }

    let config = match store_config(&cli, |key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("panda: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let repo = match open_store(config) {
        Ok(repo) => repo,
        Err(err) => {
            eprintln!("panda: failed to open store: {err}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = commands::run(&cli.command, &repo, io::stdin().lock(), io::stdout().lock());
    if let Err(err) = repo.close() {
        error!("event=cli_close module=cli status=error error={err}");
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("panda: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(cli: &Cli) -> Result<(), String> {
    let (target, fallback_level) = match cli.log_dir.as_deref() {
        Some(dir) => (LogTarget::directory(dir)?, default_log_level()),
        // stdout carries command output; keep stderr quiet unless asked.
        None => (LogTarget::Stderr, "warn"),
    };
    init_logging(cli.log_level.as_deref().unwrap_or(fallback_level), target)
}

/// Builds the store config from `lookup` (the environment in `main`), then
/// applies the location flags on top.
fn store_config<F>(cli: &Cli, lookup: F) -> anyhow::Result<StoreConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let config = StoreConfig::from_lookup(lookup)?;
    let located = if let Some(name) = &cli.memory {
        StoreConfig::memory(name.clone())
    } else if let Some(path) = &cli.db {
        StoreConfig::file(path.clone())
    } else {
        return Ok(config);
    };
    Ok(located.with_busy_timeout(config.busy_timeout))
}

/// Opens the store eagerly so an unusable location fails before any command runs.
fn open_store(config: StoreConfig) -> RepoResult<DocumentBackendRepository> {
    DocumentBackendRepository::connect(config).inspect_err(|err| {
        error!("event=cli_init module=cli status=error error={err}");
    })
}
