//! Application record model.
//!
//! # Responsibility
//! - Define the canonical record returned by list reads.
//! - Validate caller-supplied attribute maps and stored documents.
//! - Provide the top-level merge used by every backend for partial updates.
//!
//! # Invariants
//! - `id` is assigned by the store and never appears inside a document.
//! - `createdAt` is written once at insert and never touched by a merge.
//! - `updatedAt` never moves backwards and is always >= `createdAt`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Store-assigned identifier of an application record.
pub type ApplicationId = Uuid;

/// Open attribute map supplied by callers (company, role, dates, ...).
pub type Fields = Map<String, Value>;

pub const FIELD_ID: &str = "id";
pub const FIELD_CREATED_AT: &str = "createdAt";
pub const FIELD_UPDATED_AT: &str = "updatedAt";

pub const FIELD_COMPANY: &str = "company";
pub const FIELD_ROLE: &str = "role";
pub const FIELD_APPLIED_DATE: &str = "appliedDate";
pub const FIELD_STATUS: &str = "status";

/// Attribute names owned by the store. Callers may not write them.
pub const RESERVED_FIELDS: [&str; 3] = [FIELD_ID, FIELD_CREATED_AT, FIELD_UPDATED_AT];

/// Attribute used to order `list` results when none is configured.
pub const DEFAULT_ORDER_FIELD: &str = FIELD_APPLIED_DATE;

static FIELD_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid field name regex"));

/// Validation failures for attribute maps and stored documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationValidationError {
    /// `add` requires at least one attribute.
    EmptyFields,
    /// Caller tried to write a store-managed attribute.
    ReservedField(String),
    /// Name cannot be used as an ordering attribute.
    InvalidFieldName(String),
    /// Stored document lacks a store-managed timestamp.
    MissingTimestamp(&'static str),
    /// Timestamp is present but not an integer epoch-millisecond value.
    InvalidTimestamp { field: &'static str, value: String },
    /// `updatedAt` is earlier than `createdAt`.
    TimestampOrder { created_at: i64, updated_at: i64 },
}

impl Display for ApplicationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFields => write!(f, "application fields cannot be empty"),
            Self::ReservedField(name) => {
                write!(f, "field `{name}` is managed by the store and cannot be written")
            }
            Self::InvalidFieldName(name) => write!(
                f,
                "invalid field name `{name}`; expected [A-Za-z_][A-Za-z0-9_]*"
            ),
            Self::MissingTimestamp(field) => write!(f, "document is missing `{field}`"),
            Self::InvalidTimestamp { field, value } => {
                write!(f, "`{field}` must be epoch milliseconds, got `{value}`")
            }
            Self::TimestampOrder {
                created_at,
                updated_at,
            } => write!(
                f,
                "updatedAt ({updated_at}) must be >= createdAt ({created_at})"
            ),
        }
    }
}

impl Error for ApplicationValidationError {}

/// One application as returned by `list`: identifier merged with stored fields.
///
/// Serializes as a single flat object:
/// `{"id": ..., <fields>..., "createdAt": ..., "updatedAt": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    /// Caller-supplied attributes, without the store-managed ones.
    #[serde(flatten)]
    pub fields: Fields,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl ApplicationRecord {
    /// Builds a record from a stored document, splitting off timestamps.
    ///
    /// # Errors
    /// - Missing or non-integer timestamps.
    /// - `updatedAt < createdAt`.
    /// - A document that carries an `id` attribute.
    pub fn from_document(
        id: ApplicationId,
        mut document: Fields,
    ) -> Result<Self, ApplicationValidationError> {
        if document.contains_key(FIELD_ID) {
            return Err(ApplicationValidationError::ReservedField(
                FIELD_ID.to_string(),
            ));
        }
        let created_at = take_timestamp(&mut document, FIELD_CREATED_AT)?;
        let updated_at = take_timestamp(&mut document, FIELD_UPDATED_AT)?;
        check_timestamp_order(created_at, updated_at)?;

        Ok(Self {
            id,
            fields: document,
            created_at,
            updated_at,
        })
    }

    /// Returns one caller attribute.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns one caller attribute when it is a JSON string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// Checks a caller-supplied attribute map.
///
/// `allow_empty` is `false` for `add` and `true` for `update`, where an empty
/// map only refreshes `updatedAt`.
pub fn validate_caller_fields(
    fields: &Fields,
    allow_empty: bool,
) -> Result<(), ApplicationValidationError> {
    if !allow_empty && fields.is_empty() {
        return Err(ApplicationValidationError::EmptyFields);
    }
    if let Some(name) = RESERVED_FIELDS
        .iter()
        .find(|name| fields.contains_key(**name))
    {
        return Err(ApplicationValidationError::ReservedField(
            (*name).to_string(),
        ));
    }
    Ok(())
}

/// Checks a full document before it is inserted by a backend.
pub fn validate_document(document: &Fields) -> Result<(), ApplicationValidationError> {
    if document.contains_key(FIELD_ID) {
        return Err(ApplicationValidationError::ReservedField(
            FIELD_ID.to_string(),
        ));
    }
    let created_at = read_timestamp(document, FIELD_CREATED_AT)?;
    let updated_at = read_timestamp(document, FIELD_UPDATED_AT)?;
    check_timestamp_order(created_at, updated_at)
}

/// Checks that `name` can be used as a list ordering attribute.
pub fn validate_order_field(name: &str) -> Result<(), ApplicationValidationError> {
    if FIELD_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(ApplicationValidationError::InvalidFieldName(
            name.to_string(),
        ))
    }
}

/// Merges `patch` into `document` at the top level.
///
/// Keys absent from `patch` are left untouched. `updatedAt` from the patch is
/// clamped so it never moves the stored value backwards.
///
/// # Errors
/// - `patch` writes `id` or `createdAt`.
/// - `patch` carries a malformed `updatedAt`.
pub fn merge_document(
    document: &mut Fields,
    patch: &Fields,
) -> Result<(), ApplicationValidationError> {
    for name in [FIELD_ID, FIELD_CREATED_AT] {
        if patch.contains_key(name) {
            return Err(ApplicationValidationError::ReservedField(
                name.to_string(),
            ));
        }
    }

    for (name, value) in patch {
        if name == FIELD_UPDATED_AT {
            let incoming = timestamp_value(FIELD_UPDATED_AT, value)?;
            let stored = read_timestamp(document, FIELD_UPDATED_AT).unwrap_or(incoming);
            document.insert(name.clone(), Value::from(incoming.max(stored)));
            continue;
        }
        document.insert(name.clone(), value.clone());
    }
    Ok(())
}

fn read_timestamp(
    document: &Fields,
    field: &'static str,
) -> Result<i64, ApplicationValidationError> {
    let value = document
        .get(field)
        .ok_or(ApplicationValidationError::MissingTimestamp(field))?;
    timestamp_value(field, value)
}

fn take_timestamp(
    document: &mut Fields,
    field: &'static str,
) -> Result<i64, ApplicationValidationError> {
    let value = document
        .remove(field)
        .ok_or(ApplicationValidationError::MissingTimestamp(field))?;
    timestamp_value(field, &value)
}

fn timestamp_value(field: &'static str, value: &Value) -> Result<i64, ApplicationValidationError> {
    value
        .as_i64()
        .ok_or_else(|| ApplicationValidationError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
}

fn check_timestamp_order(
    created_at: i64,
    updated_at: i64,
) -> Result<(), ApplicationValidationError> {
    if updated_at < created_at {
        return Err(ApplicationValidationError::TimestampOrder {
            created_at,
            updated_at,
        });
    }
    Ok(())
}
