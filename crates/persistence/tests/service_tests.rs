//! Record Writer integration tests.
//!
//! Exercises create, update and bulk update against the SQLite system of
//! record, including concurrent writers on a file-backed database.

#![cfg(feature = "sqlite")]

mod common;

use std::sync::Arc;

use workhub_persistence::core::{EmployeeStorage, OutboxStore};
use workhub_persistence::error::{ErrorCategory, ResourceError, StorageError, ValidationError};
use workhub_persistence::types::{AcceptedField, BulkEmployeeUpdate, EmployeeDto, EmployeeFields};

use common::*;

// ============================================================================
// Scenario
// ============================================================================

#[tokio::test]
async fn test_employee_lifecycle_scenario() {
    let t = memory_service();

    let first = t.service.create(employee("jdoe", "555-0100")).await.unwrap();
    assert!(first.id > 0);

    let err = t
        .service
        .create(employee("other", "555-0100"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Resource(ResourceError::AlreadyExists { .. })
    ));
    assert_eq!(err.category(), ErrorCategory::Conflict);

    let found = t.service.get_by_username("jdoe").await.unwrap();
    assert_eq!(found, first);

    let err = t
        .service
        .update_by_identity(EmployeeDto {
            id: Some(first.id),
            username: Some("changed".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::BadRequest);

    let unchanged = t.service.get_by_id(first.id).await.unwrap();
    assert_eq!(unchanged.username, "jdoe");
    assert_eq!(unchanged.version, 1);
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_requires_username_and_phone() {
    let t = memory_service();

    let err = t
        .service
        .create(EmployeeDto {
            phone_number: Some("555-0100".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::MissingRequiredField { .. })
    ));
    assert_eq!(t.backend.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_create_assigns_identity_and_ignores_supplied_id() {
    let t = memory_service();

    let a = t.service.create(employee("a", "1").with_id(42)).await.unwrap();
    let b = t.service.create(employee("b", "2")).await.unwrap();

    assert_ne!(a.id, 42);
    assert!(b.id > a.id);
}

#[tokio::test]
async fn test_failed_create_leaves_no_trace() {
    let t = memory_service();
    t.service.create(employee("jdoe", "555-0100")).await.unwrap();

    let _ = t.service.create(employee("jdoe2", "555-0100")).await;
    let _ = t.service.create(employee("jdoe", "555-0199")).await;

    assert_eq!(t.backend.count().await.unwrap(), 1);
    assert_eq!(t.backend.pending_count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_same_phone_exactly_one_wins() {
    let dir = tempfile::tempdir().unwrap();
    let t = Arc::new(service_with(file_backend(dir.path()), outbox_delivery()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let t = t.clone();
        handles.push(tokio::spawn(async move {
            t.service
                .create(employee(&format!("racer{}", i), "555-0100"))
                .await
        }));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(e) => {
                assert_eq!(e.category(), ErrorCategory::Conflict, "unexpected error: {}", e);
                conflicts += 1;
            }
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(t.backend.count().await.unwrap(), 1);
    assert_eq!(t.backend.pending_count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_distinct_phones_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let t = Arc::new(service_with(file_backend(dir.path()), outbox_delivery()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let t = t.clone();
        handles.push(tokio::spawn(async move {
            t.service
                .create(employee(&format!("user{}", i), &format!("555-01{:02}", i)))
                .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(t.backend.count().await.unwrap(), 8);
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_never_changes_identity_or_username() {
    let t = memory_service();
    let created = t.service.create(employee("jdoe", "555-0100")).await.unwrap();

    let updated = t
        .service
        .update_by_identity(EmployeeDto {
            id: Some(created.id),
            username: Some("jdoe".to_string()),
            phone_number: Some("555-0200".to_string()),
            fields: EmployeeFields {
                first_name: Some("John".to_string()),
                salary: Some(5000.0),
                ..Default::default()
            },
        })
        .await
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.username, "jdoe");
    assert_eq!(updated.phone_number, "555-0200");
    assert_eq!(updated.fields.first_name.as_deref(), Some("John"));
    assert_eq!(updated.version, created.version + 1);
    assert_eq!(updated.created_at, created.created_at);
}

#[tokio::test]
async fn test_update_overwrites_all_mutable_fields() {
    let t = memory_service();
    let created = t
        .service
        .create(employee_in("jdoe", "555-0100", "Sales", 40))
        .await
        .unwrap();

    let updated = t
        .service
        .update_by_identity(EmployeeDto {
            id: Some(created.id),
            fields: EmployeeFields {
                position: Some("Lead".to_string()),
                ..Default::default()
            },
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(updated.fields.position.as_deref(), Some("Lead"));
    assert!(updated.fields.department.is_none());
    assert!(updated.fields.age.is_none());
}

#[tokio::test]
async fn test_update_missing_identity_is_not_found() {
    let t = memory_service();

    let err = t
        .service
        .update_by_identity(employee("ghost", "555-0100").with_id(999))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
    assert_eq!(t.backend.pending_count().await.unwrap(), 0);
}

// ============================================================================
// Bulk update
// ============================================================================

#[tokio::test]
async fn test_bulk_applies_every_directive_to_every_id() {
    let t = memory_service();
    let a = t.service.create(employee("a", "1")).await.unwrap();
    let b = t.service.create(employee("b", "2")).await.unwrap();

    let update = BulkEmployeeUpdate::new(vec![b.id, a.id])
        .with_field(AcceptedField::Department, "Ops")
        .with_field(AcceptedField::Age, "33")
        .with_field(AcceptedField::HireDate, "2021-06-01");

    let mutated = t.service.bulk_apply_fields(&update).await.unwrap();
    assert_eq!(mutated.iter().map(|e| e.id).collect::<Vec<_>>(), vec![b.id, a.id]);

    for id in [a.id, b.id] {
        let stored = t.backend.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.fields.department.as_deref(), Some("Ops"));
        assert_eq!(stored.fields.age, Some(33));
        assert_eq!(stored.version, 2);
    }
}

#[tokio::test]
async fn test_bulk_duplicate_ids_rejected_before_mutation() {
    let t = memory_service();
    let a = t.service.create(employee("a", "1")).await.unwrap();

    let update = BulkEmployeeUpdate::new(vec![a.id, a.id])
        .with_field(AcceptedField::Position, "Manager");
    let err = t.service.bulk_apply_fields(&update).await.unwrap_err();

    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::DuplicateIds { ref ids }) if ids == &vec![a.id]
    ));
    let stored = t.backend.find_by_id(a.id).await.unwrap().unwrap();
    assert_eq!(stored, a);
}

#[tokio::test]
async fn test_bulk_invalid_value_rolls_back_batch() {
    let t = memory_service();
    let a = t.service.create(employee("a", "1")).await.unwrap();
    let b = t.service.create(employee("b", "2")).await.unwrap();

    let update = BulkEmployeeUpdate::new(vec![a.id, b.id])
        .with_field(AcceptedField::Department, "Ops")
        .with_field(AcceptedField::Age, "thirty");
    let err = t.service.bulk_apply_fields(&update).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::BadRequest);

    assert_eq!(t.backend.find_by_id(a.id).await.unwrap().unwrap(), a);
    assert_eq!(t.backend.find_by_id(b.id).await.unwrap().unwrap(), b);
}

#[tokio::test]
async fn test_bulk_phone_directive_skips_uniqueness_check() {
    let t = memory_service();
    let a = t.service.create(employee("a", "555-0001")).await.unwrap();
    let b = t.service.create(employee("b", "555-0002")).await.unwrap();

    let update =
        BulkEmployeeUpdate::new(vec![b.id]).with_field(AcceptedField::PhoneNumber, "555-0001");
    t.service.bulk_apply_fields(&update).await.unwrap();

    let stored = t.backend.find_by_id(b.id).await.unwrap().unwrap();
    assert_eq!(stored.phone_number, a.phone_number);
}
