//! TOML configuration for embedding callers.
//!
//! # Responsibility
//! - Describe where the application store lives, how `list` is ordered,
//!   and where logs go.
//! - Turn that description into an open session and an active logger.
//!
//! Every section and key is optional:
//!
//! ```toml
//! [database]
//! path = "/var/lib/interntrack/interntrack.sqlite3"  # omitted: in-memory
//!
//! [collection]
//! order_field = "appliedDate"
//!
//! [logging]
//! level = "info"
//! dir = "/var/log/interntrack"                       # omitted: no file logging
//! ```

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::logging::{init_logging_with, LogLevel};
use crate::model::application::{
    validate_order_field, ApplicationValidationError, DEFAULT_ORDER_FIELD,
};
use crate::repo::application_repo::ApplicationRepository;
use crate::service::application_service::ApplicationService;
use rusqlite::Connection;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Configuration load/apply failure.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(ApplicationValidationError),
    Logging(String),
    Db(DbError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Invalid(err) => write!(f, "invalid config: {err}"),
            Self::Logging(message) => write!(f, "logging setup failed: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(err) => Some(err),
            Self::Logging(_) => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<DbError> for ConfigError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ApplicationValidationError> for ConfigError {
    fn from(value: ApplicationValidationError) -> Self {
        Self::Invalid(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub database: DatabaseConfig,
    pub collection: CollectionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite file. `None` keeps the store in memory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectionConfig {
    /// Attribute `list` orders by, newest first.
    pub order_field: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            order_field: DEFAULT_ORDER_FIELD.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Absolute directory for rolling log files. `None` leaves logging untouched.
    pub dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_order_field(&self.collection.order_field)?;
        if let Some(dir) = &self.logging.dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Logging(format!(
                    "log dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Starts file logging when `[logging].dir` is set.
    ///
    /// Returns `Ok(false)` when no directory is configured.
    pub fn init_logging(&self) -> Result<bool, ConfigError> {
        let Some(dir) = &self.logging.dir else {
            return Ok(false);
        };
        init_logging_with(self.logging.level, dir).map_err(ConfigError::Logging)?;
        Ok(true)
    }

    /// Opens the configured SQLite session with migrations applied.
    pub fn open_connection(&self) -> Result<Connection, ConfigError> {
        let conn = match &self.database.path {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        Ok(conn)
    }

    /// Wraps `repo` in a service ordered by the configured attribute.
    pub fn build_service<R: ApplicationRepository>(
        &self,
        repo: R,
    ) -> Result<ApplicationService<R>, ConfigError> {
        let service =
            ApplicationService::new(repo).with_order_field(self.collection.order_field.as_str())?;
        Ok(service)
    }
}
