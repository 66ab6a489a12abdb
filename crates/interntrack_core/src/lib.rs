//! Record store for tracked job applications.
//! Four operations (add, list, update, remove) over an injected backing store.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{init_logging, init_logging_with, logging_status, LogLevel};
pub use model::application::{
    ApplicationId, ApplicationRecord, ApplicationValidationError, Fields, DEFAULT_ORDER_FIELD,
    FIELD_APPLIED_DATE, FIELD_COMPANY, FIELD_CREATED_AT, FIELD_ROLE, FIELD_STATUS,
    FIELD_UPDATED_AT,
};
pub use repo::application_repo::{
    ApplicationRepository, RepoError, RepoResult, SqliteApplicationRepository,
};
pub use repo::memory_repo::MemoryApplicationRepository;
pub use service::application_service::ApplicationService;
pub use service::clock::{Clock, SystemClock};

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
