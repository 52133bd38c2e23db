//! Collection tables of the document store.
//!
//! # Responsibility
//! - Own the table layout every document collection uses.
//! - Prepare a store on the root session: reject newer schemas, create
//!   missing collection tables, record the schema version.
//!
//! # Invariants
//! - Preparing a store is idempotent and runs in one transaction.
//! - A store stamped with a newer `user_version` is never written to.

use super::{DbError, DbResult};
use crate::config::StoreLocation;
use rusqlite::Connection;

/// Schema version written to `PRAGMA user_version` by this build.
pub const STORE_SCHEMA_VERSION: u32 = 1;

/// A named set of JSON documents backed by one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collection {
    pub name: &'static str,
    ddl: &'static str,
}

/// Collection holding Backend documents.
///
/// `seq` keeps insertion order for natural-order listing.
pub const BACKENDS: Collection = Collection {
    name: "backends",
    ddl: "CREATE TABLE IF NOT EXISTS backends (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        body TEXT NOT NULL CHECK (json_valid(body)),
        created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000),
        updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000)
    );",
};

const COLLECTIONS: &[Collection] = &[BACKENDS];

/// Makes every known collection usable on `conn`.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the store is newer than this build.
/// - `Collection` when a table cannot be created.
pub fn prepare_store(conn: &mut Connection, location: &StoreLocation) -> DbResult<()> {
    let stored = stored_schema_version(conn)?;
    if stored > STORE_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            location: location.clone(),
            db_version: stored,
            latest_supported: STORE_SCHEMA_VERSION,
        });
    }

    let tx = conn.transaction()?;
    for collection in COLLECTIONS {
        tx.execute_batch(collection.ddl)
            .map_err(|source| DbError::Collection {
                collection: collection.name,
                source,
            })?;
    }
    if stored < STORE_SCHEMA_VERSION {
        tx.pragma_update(None, "user_version", STORE_SCHEMA_VERSION)?;
    }
    tx.commit()?;

    Ok(())
}

/// Reads the schema version stored in `PRAGMA user_version`.
pub fn stored_schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Returns whether the table behind `collection` exists.
pub fn collection_exists(conn: &Connection, collection: &Collection) -> DbResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
        [collection.name],
        |row| row.get::<_, bool>(0),
    )?;
    Ok(exists)
}
