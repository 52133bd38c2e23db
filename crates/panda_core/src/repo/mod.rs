//! Repository layer abstractions and document store implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQL and JSON document details from callers.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `MissingId`) in
//!   addition to store transport errors.

pub mod backend_repo;
pub mod filter;
