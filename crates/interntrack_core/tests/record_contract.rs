//! Behaviour every backend must share, run against SQLite and memory stores.

use interntrack_core::db::open_db_in_memory;
use interntrack_core::{
    ApplicationRepository, ApplicationService, Clock, Fields, MemoryApplicationRepository,
    RepoError, SqliteApplicationRepository,
};
use serde_json::{json, Value};
use std::cell::Cell;
use uuid::Uuid;

type Service<'a> = ApplicationService<&'a dyn ApplicationRepository>;

fn with_each_backend(check: impl Fn(&str, Service<'_>)) {
    let conn = open_db_in_memory().unwrap();
    let sqlite = SqliteApplicationRepository::try_new(&conn).unwrap();
    check("sqlite", ApplicationService::new(&sqlite as &dyn ApplicationRepository));

    let memory = MemoryApplicationRepository::new();
    check("memory", ApplicationService::new(&memory as &dyn ApplicationRepository));
}

struct SteppingClock {
    next: Cell<i64>,
}

impl SteppingClock {
    fn starting_at(start: i64) -> Self {
        Self {
            next: Cell::new(start),
        }
    }
}

impl Clock for SteppingClock {
    fn now_ms(&self) -> i64 {
        let now = self.next.get();
        self.next.set(now + 10);
        now
    }
}

fn fields(value: Value) -> Fields {
    value.as_object().cloned().unwrap()
}

#[test]
fn add_returns_id_visible_in_list_with_equal_timestamps() {
    with_each_backend(|backend, service| {
        let input = fields(json!({
            "company": "Acme",
            "role": "Engineer",
            "appliedDate": "2024-01-10"
        }));
        let id = service.add(&input).unwrap();

        let records = service.list().unwrap();
        let matching: Vec<_> = records.iter().filter(|record| record.id == id).collect();
        assert_eq!(matching.len(), 1, "{backend}");
        assert_eq!(matching[0].fields, input, "{backend}");
        assert_eq!(matching[0].created_at, matching[0].updated_at, "{backend}");
        assert!(matching[0].created_at > 0, "{backend}");
    });
}

#[test]
fn list_orders_by_applied_date_descending() {
    with_each_backend(|backend, service| {
        let acme = service
            .add(&fields(json!({
                "company": "Acme",
                "role": "Engineer",
                "appliedDate": "2024-01-10"
            })))
            .unwrap();
        let globex = service
            .add(&fields(json!({
                "company": "Globex",
                "role": "Analyst",
                "appliedDate": "2024-02-01"
            })))
            .unwrap();
        let initech = service
            .add(&fields(json!({
                "company": "Initech",
                "appliedDate": "2023-12-24"
            })))
            .unwrap();

        let ids: Vec<Uuid> = service.list().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![globex, acme, initech], "{backend}");
    });
}

#[test]
fn records_without_order_field_sort_last() {
    with_each_backend(|backend, service| {
        let undated = service.add(&fields(json!({"company": "Hooli"}))).unwrap();
        let dated = service
            .add(&fields(json!({"company": "Acme", "appliedDate": "2024-01-10"})))
            .unwrap();

        let ids: Vec<Uuid> = service.list().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![dated, undated], "{backend}");
    });
}

#[test]
fn update_merges_fields_and_keeps_created_at() {
    with_each_backend(|backend, service| {
        let id = service
            .add(&fields(json!({
                "company": "Acme",
                "role": "Engineer",
                "appliedDate": "2024-01-10"
            })))
            .unwrap();
        let before = service.list().unwrap().remove(0);

        service
            .update(id, &fields(json!({"status": "interviewing"})))
            .unwrap();

        let after = service.list().unwrap().remove(0);
        assert_eq!(after.id, id, "{backend}");
        assert_eq!(after.get_str("status"), Some("interviewing"), "{backend}");
        assert_eq!(after.get_str("company"), Some("Acme"), "{backend}");
        assert_eq!(after.get_str("role"), Some("Engineer"), "{backend}");
        assert_eq!(after.get_str("appliedDate"), Some("2024-01-10"), "{backend}");
        assert_eq!(after.created_at, before.created_at, "{backend}");
        assert!(after.updated_at >= before.updated_at, "{backend}");
    });
}

#[test]
fn update_overwrites_supplied_fields_only() {
    with_each_backend(|backend, service| {
        let id = service
            .add(&fields(json!({"company": "Acme", "status": "applied", "notes": "referral"})))
            .unwrap();

        service
            .update(id, &fields(json!({"status": "offer", "notes": null})))
            .unwrap();

        let record = service.list().unwrap().remove(0);
        assert_eq!(record.get_str("status"), Some("offer"), "{backend}");
        assert_eq!(record.get("notes"), Some(&Value::Null), "{backend}");
        assert_eq!(record.get_str("company"), Some("Acme"), "{backend}");
    });
}

#[test]
fn remove_deletes_only_the_target() {
    with_each_backend(|backend, service| {
        let id1 = service
            .add(&fields(json!({"company": "Acme", "appliedDate": "2024-01-10"})))
            .unwrap();
        let id2 = service
            .add(&fields(json!({"company": "Globex", "appliedDate": "2024-02-01"})))
            .unwrap();

        service.remove(id1).unwrap();

        let ids: Vec<Uuid> = service.list().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![id2], "{backend}");
    });
}

#[test]
fn unknown_ids_are_reported_as_not_found() {
    with_each_backend(|backend, service| {
        let missing = Uuid::new_v4();

        let update = service
            .update(missing, &fields(json!({"status": "ghosted"})))
            .unwrap_err();
        assert!(matches!(update, RepoError::NotFound(id) if id == missing), "{backend}");

        let remove = service.remove(missing).unwrap_err();
        assert!(matches!(remove, RepoError::NotFound(id) if id == missing), "{backend}");

        let existing = service.add(&fields(json!({"company": "Acme"}))).unwrap();
        service.remove(existing).unwrap();
        let again = service.remove(existing).unwrap_err();
        assert!(matches!(again, RepoError::NotFound(id) if id == existing), "{backend}");
    });
}

#[test]
fn custom_order_field_is_honored() {
    with_each_backend(|backend, service| {
        let service = service.with_order_field("deadline").unwrap();
        let soon = service
            .add(&fields(json!({"company": "Acme", "deadline": 20240301})))
            .unwrap();
        let later = service
            .add(&fields(json!({"company": "Globex", "deadline": 20240415})))
            .unwrap();

        let ids: Vec<Uuid> = service.list().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![later, soon], "{backend}");
    });
}

#[test]
fn identifiers_are_unique_per_add() {
    with_each_backend(|backend, service| {
        let input = fields(json!({"company": "Acme"}));
        let first = service.add(&input).unwrap();
        let second = service.add(&input).unwrap();

        assert_ne!(first, second, "{backend}");
        assert_eq!(service.list().unwrap().len(), 2, "{backend}");
    });
}

#[test]
fn timestamp_order_fields_sort_newest_first() {
    with_each_backend(|backend, service| {
        let service = service
            .with_order_field("createdAt")
            .unwrap()
            .with_clock(SteppingClock::starting_at(1_000));
        for company in ["A", "B", "C", "D", "E", "F", "G", "H"] {
            service.add(&fields(json!({"company": company}))).unwrap();
        }

        let created: Vec<i64> = service.list().unwrap().iter().map(|r| r.created_at).collect();
        assert_eq!(
            created,
            vec![1_070, 1_060, 1_050, 1_040, 1_030, 1_020, 1_010, 1_000],
            "{backend}"
        );
    });
}

#[test]
fn updated_at_order_reflects_latest_update() {
    with_each_backend(|backend, service| {
        let service = service
            .with_order_field("updatedAt")
            .unwrap()
            .with_clock(SteppingClock::starting_at(1_000));
        let first = service.add(&fields(json!({"company": "Acme"}))).unwrap();
        let second = service.add(&fields(json!({"company": "Globex"}))).unwrap();
        let third = service.add(&fields(json!({"company": "Initech"}))).unwrap();

        service
            .update(first, &fields(json!({"status": "interviewing"})))
            .unwrap();

        let ids: Vec<Uuid> = service.list().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first, third, second], "{backend}");
    });
}
