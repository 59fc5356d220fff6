//! Change-event delivery integration tests.
//!
//! Outbox mode: envelopes are committed with their records and drained by
//! the relay. Direct mode: envelopes are handed to the publisher after
//! commit.

#![cfg(feature = "sqlite")]

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use workhub_persistence::core::OutboxStore;
use workhub_persistence::messaging::{MessagingConfig, OutboxRelay, RecordingSink};
use workhub_persistence::types::{AcceptedField, BulkEmployeeUpdate, EmployeeDto, OperationType};

use common::*;

fn relay(t: &TestService, sink: Arc<RecordingSink>, batch_size: u32) -> OutboxRelay {
    let config = MessagingConfig {
        relay_batch_size: batch_size,
        ..Default::default()
    };
    OutboxRelay::new(t.backend.clone(), sink, &config)
}

// ============================================================================
// Outbox
// ============================================================================

#[tokio::test]
async fn test_one_envelope_per_mutated_record() {
    let t = memory_service();
    let a = t.service.create(employee("a", "1")).await.unwrap();
    let b = t.service.create(employee("b", "2")).await.unwrap();
    t.service
        .update_by_identity(EmployeeDto::from(&a))
        .await
        .unwrap();
    t.service
        .bulk_apply_fields(
            &BulkEmployeeUpdate::new(vec![a.id, b.id]).with_field(AcceptedField::Position, "Lead"),
        )
        .await
        .unwrap();

    let sink = Arc::new(RecordingSink::new());
    assert_eq!(relay(&t, sink.clone(), 100).drain().await.unwrap(), 5);

    let operations: Vec<(OperationType, i64)> = sink
        .envelopes()
        .iter()
        .map(|e| (e.operation_type(), e.entity().id))
        .collect();
    assert_eq!(
        operations,
        vec![
            (OperationType::Create, a.id),
            (OperationType::Create, b.id),
            (OperationType::Update, a.id),
            (OperationType::Update, a.id),
            (OperationType::Update, b.id),
        ]
    );

    assert!(sink.delivered().iter().all(|(topic, _)| topic == TOPIC));
    assert_eq!(t.backend.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_envelope_carries_committed_snapshot() {
    let t = memory_service();
    let created = t.service.create(employee("jdoe", "555-0100")).await.unwrap();

    let pending = t.backend.pending(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].envelope.entity(), &created);
    assert_eq!(pending[0].envelope.key(), format!("EMPLOYEE:{}", created.id));
    assert_eq!(pending[0].event_id, pending[0].envelope.event_id());
}

#[tokio::test]
async fn test_rejected_writes_enqueue_nothing() {
    let t = memory_service();
    let a = t.service.create(employee("a", "1")).await.unwrap();

    let _ = t.service.create(employee("b", "1")).await;
    let _ = t
        .service
        .update_by_identity(employee("renamed", "1").with_id(a.id))
        .await;
    let bulk = BulkEmployeeUpdate::new(vec![a.id, 404]).with_field(AcceptedField::Age, "1");
    let _ = t.service.bulk_apply_fields(&bulk).await;

    assert_eq!(t.backend.pending_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_relay_redelivers_after_sink_failure() {
    let t = memory_service();
    for i in 0..3 {
        t.service
            .create(employee(&format!("u{}", i), &format!("{}", i)))
            .await
            .unwrap();
    }

    let sink = Arc::new(RecordingSink::new());
    let relay = relay(&t, sink.clone(), 10);

    sink.fail_next(1);
    let report = relay.drain_once().await.unwrap();
    assert!(report.stalled);
    assert_eq!(report.delivered, 0);
    assert_eq!(t.backend.pending_count().await.unwrap(), 3);
    assert_eq!(t.backend.pending(1).await.unwrap()[0].attempts, 1);

    assert_eq!(relay.drain().await.unwrap(), 3);
    assert_eq!(t.backend.pending_count().await.unwrap(), 0);

    let event_ids: HashSet<_> = sink.envelopes().iter().map(|e| e.event_id()).collect();
    assert_eq!(event_ids.len(), 3);
}

#[tokio::test]
async fn test_relay_batches_in_sequence_order() {
    let t = memory_service();
    let mut created = Vec::new();
    for i in 0..5 {
        created.push(
            t.service
                .create(employee(&format!("u{}", i), &format!("{}", i)))
                .await
                .unwrap()
                .id,
        );
    }

    let sink = Arc::new(RecordingSink::new());
    let relay = relay(&t, sink.clone(), 2);

    let first = relay.drain_once().await.unwrap();
    assert_eq!(first.delivered, 2);
    assert_eq!(relay.drain().await.unwrap(), 3);

    let delivered: Vec<i64> = sink.envelopes().iter().map(|e| e.entity().id).collect();
    assert_eq!(delivered, created);
}

#[tokio::test]
async fn test_relay_run_stops_on_shutdown() {
    let t = memory_service();
    t.service.create(employee("a", "1")).await.unwrap();

    let sink = Arc::new(RecordingSink::new());
    let relay = relay(&t, sink.clone(), 10);
    let (tx, rx) = tokio::sync::watch::channel(false);

    let handle = tokio::spawn(async move { relay.run(rx).await });
    while sink.is_empty() {
        tokio::task::yield_now().await;
    }
    tx.send(true).unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(sink.len(), 1);
}

// ============================================================================
// Direct
// ============================================================================

#[tokio::test]
async fn test_direct_mode_publishes_after_commit() {
    let sink = Arc::new(RecordingSink::new());
    let t = service_with(memory_backend(), direct_delivery(sink.clone()));

    let created = t.service.create(employee("jdoe", "555-0100")).await.unwrap();
    t.service
        .update_by_identity(EmployeeDto::from(&created))
        .await
        .unwrap();
    t.service.shutdown().await;

    let operations: Vec<OperationType> =
        sink.envelopes().iter().map(|e| e.operation_type()).collect();
    assert_eq!(operations, vec![OperationType::Create, OperationType::Update]);
    assert_eq!(t.backend.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_direct_mode_delivery_failure_keeps_write() {
    let sink = Arc::new(RecordingSink::new());
    sink.fail_next(u32::MAX);
    let t = service_with(memory_backend(), direct_delivery(sink.clone()));

    let created = t.service.create(employee("jdoe", "555-0100")).await.unwrap();
    assert_eq!(t.service.get_by_id(created.id).await.unwrap(), created);
}
