//! Repository layer: store contract and backends.
//!
//! # Responsibility
//! - Define the store primitives the application service depends on.
//! - Isolate SQLite and in-memory details from the service.
//!
//! # Invariants
//! - Backends validate documents before persisting them.
//! - Every backend reports unknown ids as `RepoError::NotFound`.

pub mod application_repo;
pub mod memory_repo;
