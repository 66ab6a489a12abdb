//! Application record store.
//!
//! # Responsibility
//! - Expose `add`, `list`, `update`, `remove` over an injected repository.
//! - Stamp `createdAt`/`updatedAt` on writes.
//! - Log every failure where it happens, then return it unchanged.
//!
//! # Invariants
//! - Each operation is exactly one repository call; no retries, no fallbacks.
//! - Caller maps never carry store-managed attributes into the repository.
//! - The service caches nothing between calls.

use crate::model::application::{
    validate_caller_fields, validate_order_field, ApplicationId, ApplicationRecord,
    ApplicationValidationError, Fields, DEFAULT_ORDER_FIELD, FIELD_CREATED_AT, FIELD_UPDATED_AT,
};
use crate::repo::application_repo::{ApplicationRepository, RepoResult};
use crate::service::clock::{Clock, SystemClock};
use log::{debug, error};
use serde_json::Value;
use std::time::Instant;

/// Four-operation façade over one application repository.
pub struct ApplicationService<R: ApplicationRepository, C: Clock = SystemClock> {
    repo: R,
    clock: C,
    order_field: String,
}

impl<R: ApplicationRepository> ApplicationService<R> {
    /// Creates a service ordering `list` by `appliedDate`, stamped by the system clock.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            clock: SystemClock,
            order_field: DEFAULT_ORDER_FIELD.to_string(),
        }
    }
}

impl<R: ApplicationRepository, C: Clock> ApplicationService<R, C> {
    /// Replaces the timestamp source.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> ApplicationService<R, C2> {
        ApplicationService {
            repo: self.repo,
            clock,
            order_field: self.order_field,
        }
    }

    /// Orders `list` results by `field` descending.
    ///
    /// # Errors
    /// - `field` is not a plain identifier (`[A-Za-z_][A-Za-z0-9_]*`).
    pub fn with_order_field(
        mut self,
        field: impl Into<String>,
    ) -> Result<Self, ApplicationValidationError> {
        let field = field.into();
        validate_order_field(&field)?;
        self.order_field = field;
        Ok(self)
    }

    /// Attribute used to order `list` results.
    pub fn order_field(&self) -> &str {
        &self.order_field
    }

    /// Underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Inserts a new application and returns its store-assigned id.
    ///
    /// # Contract
    /// - `fields` must be non-empty and must not contain `id`, `createdAt`
    ///   or `updatedAt`.
    /// - `createdAt == updatedAt == now` on the stored record.
    pub fn add(&self, fields: &Fields) -> RepoResult<ApplicationId> {
        let started_at = Instant::now();
        let result = self.add_inner(fields);
        log_outcome("application_add", result.as_ref().ok().copied(), started_at, &result);
        result
    }

    /// Returns every application, newest `order_field` first.
    ///
    /// All-or-nothing: one unreadable record fails the whole call.
    pub fn list(&self) -> RepoResult<Vec<ApplicationRecord>> {
        let started_at = Instant::now();
        let result = self.repo.list_applications(&self.order_field);
        match &result {
            Ok(records) => debug!(
                "event=application_list module=service status=ok order_field={} count={} duration_ms={}",
                self.order_field,
                records.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=application_list module=service status=error order_field={} duration_ms={} error={}",
                self.order_field,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Merges `fields` into an existing application and refreshes `updatedAt`.
    ///
    /// Unspecified attributes are kept. An empty map only refreshes `updatedAt`.
    /// Unknown ids surface as the repository's `NotFound`.
    pub fn update(&self, id: ApplicationId, fields: &Fields) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.update_inner(id, fields);
        log_outcome("application_update", Some(id), started_at, &result);
        result
    }

    /// Permanently deletes an application.
    ///
    /// An unknown id fails with `RepoError::NotFound`, unlike Firestore's
    /// `deleteDoc`, which silently succeeds for a missing document.
    pub fn remove(&self, id: ApplicationId) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.repo.delete_application(id);
        log_outcome("application_remove", Some(id), started_at, &result);
        result
    }

    fn add_inner(&self, fields: &Fields) -> RepoResult<ApplicationId> {
        validate_caller_fields(fields, false)?;

        let now = self.clock.now_ms();
        let mut document = fields.clone();
        document.insert(FIELD_CREATED_AT.to_string(), Value::from(now));
        document.insert(FIELD_UPDATED_AT.to_string(), Value::from(now));
        self.repo.insert_application(&document)
    }

    fn update_inner(&self, id: ApplicationId, fields: &Fields) -> RepoResult<()> {
        validate_caller_fields(fields, true)?;

        let mut patch = fields.clone();
        patch.insert(
            FIELD_UPDATED_AT.to_string(),
            Value::from(self.clock.now_ms()),
        );
        self.repo.merge_application(id, &patch)
    }
}

fn log_outcome<T>(
    event: &'static str,
    id: Option<ApplicationId>,
    started_at: Instant,
    result: &RepoResult<T>,
) {
    let id = id.map_or_else(|| "-".to_string(), |id| id.to_string());
    match result {
        Ok(_) => debug!(
            "event={event} module=service status=ok id={id} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event={event} module=service status=error id={id} duration_ms={} error={err}",
            started_at.elapsed().as_millis()
        ),
    }
}
