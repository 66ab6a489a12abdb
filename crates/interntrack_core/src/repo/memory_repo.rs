//! In-memory application repository.
//!
//! # Responsibility
//! - Provide a dependency-free backend for tests and embedding callers.
//! - Simulate an unreachable store via `set_available(false)`.
//!
//! # Invariants
//! - Ordering and not-found semantics match `SqliteApplicationRepository`.
//! - A failed call never mutates stored documents.

use crate::model::application::{
    merge_document, validate_document, validate_order_field, ApplicationId, ApplicationRecord,
    Fields,
};
use crate::repo::application_repo::{ApplicationRepository, RepoError, RepoResult};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Mutex-guarded map of documents keyed by id.
#[derive(Debug)]
pub struct MemoryApplicationRepository {
    state: Mutex<MemoryState>,
}

#[derive(Debug)]
struct MemoryState {
    available: bool,
    documents: BTreeMap<ApplicationId, Fields>,
}

impl Default for MemoryApplicationRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryApplicationRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                available: true,
                documents: BTreeMap::new(),
            }),
        }
    }

    /// Toggles simulated reachability. While unavailable every call fails
    /// with `RepoError::Unavailable` and nothing is read or written.
    pub fn set_available(&self, available: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.available = available;
        }
    }

    /// Number of stored documents, ignoring availability.
    pub fn len(&self) -> usize {
        self.state.lock().map_or(0, |state| state.documents.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn reachable_state(&self) -> RepoResult<MutexGuard<'_, MemoryState>> {
        let state = self
            .state
            .lock()
            .map_err(|_| RepoError::Unavailable("memory store lock poisoned".to_string()))?;
        if !state.available {
            return Err(RepoError::Unavailable(
                "memory store is offline".to_string(),
            ));
        }
        Ok(state)
    }
}

impl ApplicationRepository for MemoryApplicationRepository {
    fn insert_application(&self, document: &Fields) -> RepoResult<ApplicationId> {
        let mut state = self.reachable_state()?;
        validate_document(document)?;

        let id = Uuid::new_v4();
        state.documents.insert(id, document.clone());
        Ok(id)
    }

    fn list_applications(&self, order_field: &str) -> RepoResult<Vec<ApplicationRecord>> {
        let state = self.reachable_state()?;
        validate_order_field(order_field)?;

        // Stored documents still carry `createdAt`/`updatedAt`, so both are sortable.
        let mut documents: Vec<(&ApplicationId, &Fields)> = state.documents.iter().collect();
        documents.sort_by(|(left_id, left), (right_id, right)| {
            compare_desc(left.get(order_field), right.get(order_field))
                .then_with(|| left_id.cmp(right_id))
        });

        let records = documents
            .into_iter()
            .map(|(id, document)| {
                ApplicationRecord::from_document(*id, document.clone()).map_err(|err| {
                    RepoError::InvalidData(format!("application {id}: {err}"))
                })
            })
            .collect::<RepoResult<Vec<_>>>()?;

        Ok(records)
    }

    fn merge_application(&self, id: ApplicationId, patch: &Fields) -> RepoResult<()> {
        let mut state = self.reachable_state()?;
        let stored = state.documents.get(&id).ok_or(RepoError::NotFound(id))?;

        let mut document = stored.clone();
        merge_document(&mut document, patch)?;
        validate_document(&document)?;
        state.documents.insert(id, document);
        Ok(())
    }

    fn delete_application(&self, id: ApplicationId) -> RepoResult<()> {
        let mut state = self.reachable_state()?;
        state
            .documents
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound(id))
    }
}

/// Descending order with missing/null values last, mirroring SQLite's
/// `NULL < INTEGER/REAL < TEXT` ranking for `json_extract`.
fn compare_desc(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    sort_key(right).cmp_key(&sort_key(left))
}

#[derive(Debug, PartialEq, PartialOrd)]
enum SortKey<'a> {
    Null,
    Number(f64),
    Text(&'a str),
    Json(String),
}

impl SortKey<'_> {
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }
}

fn sort_key(value: Option<&Value>) -> SortKey<'_> {
    match value {
        None | Some(Value::Null) => SortKey::Null,
        Some(Value::Bool(flag)) => SortKey::Number(if *flag { 1.0 } else { 0.0 }),
        Some(Value::Number(number)) => SortKey::Number(number.as_f64().unwrap_or(0.0)),
        Some(Value::String(text)) => SortKey::Text(text),
        Some(other) => SortKey::Json(other.to_string()),
    }
}
