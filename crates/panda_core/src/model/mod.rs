//! Domain model persisted by the document store.
//!
//! # Responsibility
//! - Define the in-memory shape of every stored entity.
//! - Keep identity rules next to the entity they apply to.
//!
//! # Invariants
//! - Every stored entity carries a stable identifier.

pub mod backend;
