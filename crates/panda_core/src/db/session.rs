//! Session handles for the document store.
//!
//! # Responsibility
//! - Open the root session: connect, configure pragmas, prepare collections.
//! - Hand out lightweight session copies for single operations.
//!
//! # Invariants
//! - A root session has every collection table in place before it is returned.
//! - Copies never touch the schema; they share the root session's database.
//! - In-memory stores stay alive only while their root session is open.
//! - Every session honours the configured busy timeout, memory stores included.

use super::collection::prepare_store;
use super::{DbError, DbResult, SessionOp};
use crate::config::{StoreConfig, StoreLocation};
use log::{debug, error, info};
use rusqlite::{Connection, OpenFlags};
use std::time::{Duration, Instant};

/// Connection/context to the document store.
///
/// Dropping a session releases its connection.
#[derive(Debug)]
pub struct Session {
    location: StoreLocation,
    busy_timeout: Duration,
    conn: Connection,
}

impl Session {
    /// Opens the root session for `config` and prepares its collections.
    ///
    /// # Side effects
    /// - Creates the database file when it does not exist yet.
    /// - Emits `db_open` logging events with duration and status.
    pub fn connect(config: &StoreConfig) -> DbResult<Self> {
        let started_at = Instant::now();
        let mode = config.location.mode();
        info!("event=db_open module=db status=start mode={mode}");

        match open_root(config) {
            Ok(conn) => {
                info!(
                    "event=db_open module=db status=ok mode={mode} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(Self {
                    location: config.location.clone(),
                    busy_timeout: config.busy_timeout,
                    conn,
                })
            }
            Err(err) => {
                error!(
                    "event=db_open module=db status=error mode={mode} duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Opens an independent session on the same store.
    ///
    /// The copy carries no state from this session apart from its location
    /// and settings, so copies may be used from different threads at once.
    pub fn copy(&self) -> DbResult<Self> {
        let conn = open_connection(&self.location, self.busy_timeout)
            .map_err(|source| self.session_error(SessionOp::Copy, source))?;
        debug!(
            "event=session_copy module=db status=ok mode={}",
            self.location.mode()
        );
        Ok(Self {
            location: self.location.clone(),
            busy_timeout: self.busy_timeout,
            conn,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Closes the session, reporting errors that a plain drop would swallow.
    pub fn close(self) -> DbResult<()> {
        let Self { location, conn, .. } = self;
        conn.close().map_err(|(_, source)| DbError::Session {
            op: SessionOp::Close,
            location: location.clone(),
            source,
        })?;
        debug!(
            "event=session_close module=db status=ok mode={}",
            location.mode()
        );
        Ok(())
    }

    fn session_error(&self, op: SessionOp, source: rusqlite::Error) -> DbError {
        DbError::Session {
            op,
            location: self.location.clone(),
            source,
        }
    }
}

fn open_root(config: &StoreConfig) -> DbResult<Connection> {
    let connect_error = |source| DbError::Session {
        op: SessionOp::Connect,
        location: config.location.clone(),
        source,
    };

    let mut conn = open_connection(&config.location, config.busy_timeout).map_err(connect_error)?;
    if let StoreLocation::File(_) = config.location {
        // WAL lets session copies read while another copy writes.
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })
        .map_err(connect_error)?;
    }
    prepare_store(&mut conn, &config.location)?;
    Ok(conn)
}

fn open_connection(location: &StoreLocation, busy_timeout: Duration) -> rusqlite::Result<Connection> {
    let conn = match location {
        StoreLocation::File(path) => Connection::open(path)?,
        StoreLocation::Memory(name) => Connection::open_with_flags(
            memory_uri(name),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?,
    };
    conn.busy_timeout(busy_timeout)?;
    Ok(conn)
}

/// URI of a named in-memory store.
///
/// The memdb VFS shares one database between every connection that opens
/// the same `/name`, with regular file locking, so busy timeouts apply.
fn memory_uri(name: &str) -> String {
    format!("file:/{}?vfs=memdb", urlencoding::encode(name))
}
