//! Domain model for tracked job applications.
//!
//! # Responsibility
//! - Define the record shape shared by the service and every repository backend.
//! - Own field-level rules for store-managed attributes (`id`, timestamps).
//!
//! # Invariants
//! - Every record is identified by a store-assigned `ApplicationId`.
//! - Deletion is permanent; there are no tombstones.

pub mod application;
