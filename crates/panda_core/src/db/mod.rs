//! Document store bootstrap built on SQLite.
//!
//! # Responsibility
//! - Open the root session and per-operation session copies.
//! - Create the collection tables a store needs before first use.
//!
//! # Invariants
//! - The store schema version is tracked via `PRAGMA user_version`.
//! - No collection is read or written before its table exists.
//! - Every collection stores one JSON document per row in `body`.

use crate::config::StoreLocation;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod collection;
mod session;

pub use session::Session;

pub type DbResult<T> = Result<T, DbError>;

/// Session lifecycle step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOp {
    Connect,
    Copy,
    Close,
}

impl Display for SessionOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Connect => "connect",
            Self::Copy => "copy",
            Self::Close => "close",
        };
        f.write_str(label)
    }
}

#[derive(Debug)]
pub enum DbError {
    /// Statement failure inside a repository operation.
    Sqlite(rusqlite::Error),
    /// Opening, configuring or closing a session failed.
    Session {
        op: SessionOp,
        location: StoreLocation,
        source: rusqlite::Error,
    },
    /// Creating a collection table failed.
    Collection {
        collection: &'static str,
        source: rusqlite::Error,
    },
    /// The store was written by a newer schema than this build knows.
    UnsupportedSchemaVersion {
        location: StoreLocation,
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Session {
                op,
                location,
                source,
            } => write!(f, "session {op} failed for `{location}`: {source}"),
            Self::Collection { collection, source } => {
                write!(f, "failed to prepare collection `{collection}`: {source}")
            }
            Self::UnsupportedSchemaVersion {
                location,
                db_version,
                latest_supported,
            } => write!(
                f,
                "store `{location}` has schema version {db_version}, newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Session { source, .. } | Self::Collection { source, .. } => Some(source),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
