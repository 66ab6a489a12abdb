//! Use-case services.
//!
//! # Responsibility
//! - Turn caller requests into repository calls.
//! - Keep callers decoupled from storage details.

pub mod application_service;
pub mod clock;
