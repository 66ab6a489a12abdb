//! Application repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the four store primitives every backend must reproduce:
//!   insert-with-generated-id, ordered full scan, partial update by id,
//!   delete by id.
//! - Keep SQL and JSON document handling inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate documents before any SQL mutation.
//! - Read paths reject invalid persisted documents instead of masking them;
//!   a list either returns every row or fails.
//! - `merge_application`/`delete_application` on an unknown id return
//!   `RepoError::NotFound`.

use crate::db::DbError;
use crate::model::application::{
    merge_document, validate_document, validate_order_field, ApplicationId, ApplicationRecord,
    ApplicationValidationError, Fields, FIELD_CREATED_AT, FIELD_UPDATED_AT,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Store operation failure, carrying whatever detail the backend reports.
#[derive(Debug)]
pub enum RepoError {
    Validation(ApplicationValidationError),
    Db(DbError),
    NotFound(ApplicationId),
    InvalidData(String),
    Unavailable(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "application not found: {id}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted application data: {message}")
            }
            Self::Unavailable(message) => write!(f, "application store unavailable: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<ApplicationValidationError> for RepoError {
    fn from(value: ApplicationValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Store primitives behind the application service.
///
/// Documents passed in already carry `createdAt`/`updatedAt`; stamping them is
/// the caller's job.
pub trait ApplicationRepository {
    /// Inserts a document and returns the freshly generated id.
    fn insert_application(&self, document: &Fields) -> RepoResult<ApplicationId>;
    /// Returns every record ordered by `order_field` descending.
    ///
    /// Records without the field come last; ties break on id ascending.
    fn list_applications(&self, order_field: &str) -> RepoResult<Vec<ApplicationRecord>>;
    /// Merges `patch` into the stored document at the top level.
    fn merge_application(&self, id: ApplicationId, patch: &Fields) -> RepoResult<()>;
    /// Permanently deletes one record.
    fn delete_application(&self, id: ApplicationId) -> RepoResult<()>;
}

impl<R: ApplicationRepository + ?Sized> ApplicationRepository for &R {
    fn insert_application(&self, document: &Fields) -> RepoResult<ApplicationId> {
        (**self).insert_application(document)
    }

    fn list_applications(&self, order_field: &str) -> RepoResult<Vec<ApplicationRecord>> {
        (**self).list_applications(order_field)
    }

    fn merge_application(&self, id: ApplicationId, patch: &Fields) -> RepoResult<()> {
        (**self).merge_application(id, patch)
    }

    fn delete_application(&self, id: ApplicationId) -> RepoResult<()> {
        (**self).delete_application(id)
    }
}

/// SQLite-backed application repository.
///
/// Each record is one JSON document in `applications.document`; timestamps are
/// mirrored into columns for indexing.
pub struct SqliteApplicationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteApplicationRepository<'conn> {
    /// Wraps a connection returned by `db::open_db*`.
    ///
    /// # Errors
    /// - `RepoError::InvalidData` when the `applications` table is missing,
    ///   which means the connection skipped migrations.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let has_table: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'applications'
            );",
            [],
            |row| row.get(0),
        )?;
        if !has_table {
            return Err(RepoError::InvalidData(
                "applications table missing; open the connection with db::open_db".to_string(),
            ));
        }
        Ok(Self { conn })
    }
}

impl ApplicationRepository for SqliteApplicationRepository<'_> {
    fn insert_application(&self, document: &Fields) -> RepoResult<ApplicationId> {
        validate_document(document)?;
        let (created_at, updated_at) = document_timestamps(document)?;
        let id = Uuid::new_v4();

        self.conn.execute(
            "INSERT INTO applications (id, document, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![id.to_string(), encode_document(document)?, created_at, updated_at],
        )?;

        Ok(id)
    }

    fn list_applications(&self, order_field: &str) -> RepoResult<Vec<ApplicationRecord>> {
        validate_order_field(order_field)?;
        let path = format!("$.{order_field}");

        // SQLite sorts NULL below every value, so missing fields land last in DESC.
        let mut stmt = self.conn.prepare(
            "SELECT id, document
             FROM applications
             ORDER BY json_extract(document, ?1) DESC, id ASC;",
        )?;
        let mut rows = stmt.query([path])?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(parse_application_row(row)?);
        }

        Ok(records)
    }

    fn merge_application(&self, id: ApplicationId, patch: &Fields) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;

        let stored: Option<String> = tx
            .query_row(
                "SELECT document FROM applications WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(stored) = stored else {
            return Err(RepoError::NotFound(id));
        };

        let mut document = decode_document(id, &stored)?;
        merge_document(&mut document, patch)?;
        validate_document(&document)?;
        let (_, updated_at) = document_timestamps(&document)?;

        tx.execute(
            "UPDATE applications
             SET document = ?2, updated_at = ?3
             WHERE id = ?1;",
            params![id.to_string(), encode_document(&document)?, updated_at],
        )?;
        tx.commit()?;

        Ok(())
    }

    fn delete_application(&self, id: ApplicationId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM applications WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn parse_application_row(row: &Row<'_>) -> RepoResult<ApplicationRecord> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid id value `{id_text}` in applications.id"))
    })?;

    let stored: String = row.get("document")?;
    let document = decode_document(id, &stored)?;
    ApplicationRecord::from_document(id, document).map_err(|err| {
        RepoError::InvalidData(format!("application {id}: {err}"))
    })
}

fn decode_document(id: ApplicationId, stored: &str) -> RepoResult<Fields> {
    match serde_json::from_str::<Value>(stored) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(_) => Err(RepoError::InvalidData(format!(
            "application {id}: document is not a JSON object"
        ))),
        Err(err) => Err(RepoError::InvalidData(format!(
            "application {id}: {err}"
        ))),
    }
}

fn encode_document(document: &Fields) -> RepoResult<String> {
    serde_json::to_string(document)
        .map_err(|err| RepoError::InvalidData(format!("document encoding failed: {err}")))
}

fn document_timestamps(document: &Fields) -> RepoResult<(i64, i64)> {
    let created_at = document.get(FIELD_CREATED_AT).and_then(Value::as_i64);
    let updated_at = document.get(FIELD_UPDATED_AT).and_then(Value::as_i64);
    match (created_at, updated_at) {
        (Some(created_at), Some(updated_at)) => Ok((created_at, updated_at)),
        (None, _) => Err(ApplicationValidationError::MissingTimestamp(FIELD_CREATED_AT).into()),
        (_, None) => Err(ApplicationValidationError::MissingTimestamp(FIELD_UPDATED_AT).into()),
    }
}
