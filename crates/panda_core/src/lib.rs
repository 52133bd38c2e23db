//! Core storage logic for panda backend registrations.
//! This crate owns the Backend document model and its repository.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use config::{ConfigError, StoreConfig, StoreLocation};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::backend::{Backend, BackendId, BackendValidationError};
pub use repo::backend_repo::{
    BackendListQuery, BackendRepository, DocumentBackendRepository, RepoError, RepoResult,
};
pub use repo::filter::BackendFilter;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
