//! Backend repository contract and document store implementation.
//!
//! # Responsibility
//! - Provide CRUD and list APIs over the `backends` document collection.
//! - Own the shared root session and hand each call its own session copy.
//!
//! # Invariants
//! - The root session is opened at most once per repository instance.
//! - Every operation runs on a fresh session copy released before returning.
//! - Write paths call `Backend::validate()` before touching the store.
//! - Store errors are returned to callers wrapped but otherwise unchanged.
//! - After `close()` every operation fails with `RepoError::Closed`.

use crate::config::StoreConfig;
use crate::db::{DbError, Session};
use crate::model::backend::{Backend, BackendId, BackendValidationError};
use crate::repo::filter::BackendFilter;
use log::{debug, info, warn};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for backend persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Json(serde_json::Error),
    Validation(BackendValidationError),
    NotFound(BackendId),
    MissingId,
    InvalidFilter(String),
    Closed,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "invalid backend document: {err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "backend not found: {id}"),
            Self::MissingId => write!(f, "backend has no id"),
            Self::InvalidFilter(message) => write!(f, "invalid filter: {message}"),
            Self::Closed => write!(f, "repository session is closed"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::NotFound(_) | Self::MissingId | Self::InvalidFilter(_) | Self::Closed => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<BackendValidationError> for RepoError {
    fn from(value: BackendValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Query options for listing backends.
///
/// `limit == 0` means no limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendListQuery {
    pub limit: u32,
    pub offset: u32,
    pub filter: BackendFilter,
}

/// Repository interface for backend CRUD operations.
pub trait BackendRepository: Send + Sync {
    fn create_backend(&self, backend: Backend) -> RepoResult<Backend>;
    fn delete_backend(&self, id: BackendId) -> RepoResult<()>;
    fn update_backend(&self, backend: Backend) -> RepoResult<Backend>;
    fn get_backend(&self, id: BackendId) -> RepoResult<Backend>;
    fn list_backends(&self, query: &BackendListQuery) -> RepoResult<Vec<Backend>>;
    fn close(&self) -> RepoResult<()>;
}

enum SessionState {
    Pending,
    Open(Session),
    Closed,
}

/// Backend repository over the SQLite-backed document store.
///
/// Construction never touches the store; the root session is opened by the
/// first operation (or [`DocumentBackendRepository::open`]) and lives until
/// [`BackendRepository::close`] or drop.
pub struct DocumentBackendRepository {
    config: StoreConfig,
    state: Mutex<SessionState>,
}

impl DocumentBackendRepository {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            state: Mutex::new(SessionState::Pending),
        }
    }

    /// Creates a repository and opens its root session immediately.
    pub fn connect(config: StoreConfig) -> RepoResult<Self> {
        let repo = Self::new(config);
        repo.open()?;
        Ok(repo)
    }

    /// Opens the root session if it is not open yet.
    ///
    /// Idempotent; concurrent callers wait on the same initialization.
    pub fn open(&self) -> RepoResult<()> {
        let mut state = self.lock_state();
        Self::ensure_open(&self.config, &mut state)?;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.lock_state(), SessionState::Open(_))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_open<'s>(
        config: &StoreConfig,
        state: &'s mut SessionState,
    ) -> RepoResult<&'s Session> {
        if let SessionState::Pending = state {
            let root = Session::connect(config)?;
            info!(
                "event=repo_open module=repo status=ok location={}",
                config.location
            );
            *state = SessionState::Open(root);
        }

        let SessionState::Open(root) = state else {
            return Err(RepoError::Closed);
        };
        Ok(&*root)
    }

    /// Returns a per-operation copy of the root session.
    fn session(&self) -> RepoResult<Session> {
        let mut state = self.lock_state();
        let root = Self::ensure_open(&self.config, &mut state)?;
        Ok(root.copy()?)
    }
}

impl BackendRepository for DocumentBackendRepository {
    fn create_backend(&self, mut backend: Backend) -> RepoResult<Backend> {
        let started_at = Instant::now();
        backend.validate()?;
        let id = backend.ensure_id();
        let result = self.session().and_then(|session| {
            let body = serde_json::to_string(&backend)?;
            session.connection().execute(
                "INSERT INTO backends (id, body) VALUES (?1, ?2);",
                params![id.to_string(), body],
            )?;
            Ok(())
        });
        log_outcome("backend_create", id, started_at, &result);
        result.map(|()| backend)
    }

    fn delete_backend(&self, id: BackendId) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.session().and_then(|session| {
            let changed = session
                .connection()
                .execute("DELETE FROM backends WHERE id = ?1;", [id.to_string()])?;
            if changed == 0 {
                return Err(RepoError::NotFound(id));
            }
            Ok(())
        });
        log_outcome("backend_delete", id, started_at, &result);
        result
    }

    fn update_backend(&self, backend: Backend) -> RepoResult<Backend> {
        let started_at = Instant::now();
        let id = backend.id.ok_or(RepoError::MissingId)?;
        backend.validate()?;
        let result = self.session().and_then(|session| {
            let body = serde_json::to_string(&backend)?;
            let changed = session.connection().execute(
                "UPDATE backends
                 SET
                    body = ?1,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?2;",
                params![body, id.to_string()],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound(id));
            }
            Ok(())
        });
        log_outcome("backend_update", id, started_at, &result);
        result.map(|()| backend)
    }

    fn get_backend(&self, id: BackendId) -> RepoResult<Backend> {
        let session = self.session()?;
        let body: Option<String> = session
            .connection()
            .query_row(
                "SELECT body FROM backends WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(body) => parse_document(&body),
            None => Err(RepoError::NotFound(id)),
        }
    }

    fn list_backends(&self, query: &BackendListQuery) -> RepoResult<Vec<Backend>> {
        let (predicates, mut bind_values) = query.filter.to_sql()?;
        let mut sql = String::from("SELECT body FROM backends");
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }
        sql.push_str(" ORDER BY seq ASC");

        if query.limit > 0 {
            sql.push_str(" LIMIT ?");
            bind_values.push(SqlValue::Integer(i64::from(query.limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(SqlValue::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(SqlValue::Integer(i64::from(query.offset)));
        }

        let session = self.session()?;
        let mut stmt = session.connection().prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut backends = Vec::new();

        while let Some(row) = rows.next()? {
            let body: String = row.get(0)?;
            backends.push(parse_document(&body)?);
        }

        debug!(
            "event=backend_list module=repo status=ok conditions={} limit={} offset={} count={}",
            query.filter.len(),
            query.limit,
            query.offset,
            backends.len()
        );
        Ok(backends)
    }

    fn close(&self) -> RepoResult<()> {
        let previous = std::mem::replace(&mut *self.lock_state(), SessionState::Closed);
        if let SessionState::Open(root) = previous {
            root.close()?;
            info!(
                "event=repo_close module=repo status=ok location={}",
                self.config.location
            );
        }
        Ok(())
    }
}

fn parse_document(body: &str) -> RepoResult<Backend> {
    Ok(serde_json::from_str(body)?)
}

fn log_outcome<T>(event: &str, id: BackendId, started_at: Instant, result: &RepoResult<T>) {
    match result {
        Ok(_) => debug!(
            "event={event} module=repo status=ok id={id} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event={event} module=repo status=error id={id} duration_ms={} error={err}",
            started_at.elapsed().as_millis()
        ),
    }
}
