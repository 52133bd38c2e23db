//! Argument model and command execution for the `panda` binary.
//!
//! Documents travel as JSON: `create` and `update` read one document from
//! `--file` or stdin, every command prints its result to stdout.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use panda_core::{Backend, BackendFilter, BackendId, BackendListQuery, BackendRepository};
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "panda", version, about = "Manage stored backend documents")]
pub struct Cli {
    /// Database file path (overrides PANDA_DB_PATH)
    #[arg(long, global = true, conflicts_with = "memory")]
    pub db: Option<PathBuf>,

    /// Named in-memory store, useful for dry runs (overrides PANDA_DB_MEMORY)
    #[arg(long, global = true)]
    pub memory: Option<String>,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files; stderr when omitted
    #[arg(long, global = true)]
    pub log_dir: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a backend; an id is generated when the document has none
    Create(DocumentArgs),
    /// Print one backend by id
    Get(IdArgs),
    /// Replace a stored backend; the document must carry its id
    Update(DocumentArgs),
    /// Delete one backend by id
    Delete(IdArgs),
    /// List backends with optional filter and paging
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct DocumentArgs {
    /// Read the JSON document from this file instead of stdin
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct IdArgs {
    /// Backend id
    pub id: BackendId,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Maximum number of documents; 0 means no limit
    #[arg(short, long, default_value_t = 0)]
    pub limit: u32,

    /// Number of documents to skip
    #[arg(short, long, default_value_t = 0)]
    pub offset: u32,

    /// JSON object of field/value pairs that documents must equal
    #[arg(long)]
    pub filter: Option<String>,
}

/// Executes `command` against `repo`, reading documents from `input` and
/// writing pretty JSON results to `output`.
pub fn run<R, I, O>(command: &Command, repo: &R, input: I, mut output: O) -> anyhow::Result<()>
where
    R: BackendRepository + ?Sized,
    I: Read,
    O: Write,
{
    match command {
        Command::Create(args) => {
            let backend = read_document(args, input)?;
            let created = repo.create_backend(backend)?;
            write_json(&mut output, &created)?;
        }
        Command::Get(args) => {
            let backend = repo.get_backend(args.id)?;
            write_json(&mut output, &backend)?;
        }
        Command::Update(args) => {
            let backend = read_document(args, input)?;
            let updated = repo.update_backend(backend)?;
            write_json(&mut output, &updated)?;
        }
        Command::Delete(args) => {
            repo.delete_backend(args.id)?;
            writeln!(output, "deleted {}", args.id)?;
        }
        Command::List(args) => {
            let query = list_query(args)?;
            let backends = repo.list_backends(&query)?;
            write_json(&mut output, &backends)?;
        }
    }
    Ok(())
}

fn list_query(args: &ListArgs) -> anyhow::Result<BackendListQuery> {
    let filter = match args.filter.as_deref() {
        Some(raw) => {
            let value = serde_json::from_str(raw).context("--filter is not valid JSON")?;
            BackendFilter::from_json(value)?
        }
        None => BackendFilter::default(),
    };
    Ok(BackendListQuery {
        limit: args.limit,
        offset: args.offset,
        filter,
    })
}

fn read_document<I: Read>(args: &DocumentArgs, mut input: I) -> anyhow::Result<Backend> {
    let raw = match &args.file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?,
        None => {
            let mut raw = String::new();
            input
                .read_to_string(&mut raw)
                .context("failed to read document from stdin")?;
            raw
        }
    };
    if raw.trim().is_empty() {
        bail!("no backend document given");
    }
    serde_json::from_str(&raw).context("backend document is not valid JSON")
}

fn write_json<O, T>(output: &mut O, value: &T) -> anyhow::Result<()>
where
    O: Write,
    T: serde::Serialize + ?Sized,
{
    serde_json::to_writer_pretty(&mut *output, value)?;
    writeln!(output)?;
    Ok(())
}
