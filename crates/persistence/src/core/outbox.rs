//! Transactional outbox.
//!
//! Envelopes enqueued inside a write transaction land in the outbox with
//! the record change. A relay later reads pending entries, hands them to a
//! sink and marks them delivered, which yields at-least-once delivery even
//! if the process dies between commit and publish.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StorageResult;
use crate::types::ChangeEnvelope;

/// A queued envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    /// Monotonic sequence number; delivery follows this order.
    pub seq: i64,
    /// Event id carried by the envelope.
    pub event_id: Uuid,
    /// Destination topic.
    pub topic: String,
    pub envelope: ChangeEnvelope,
    /// Failed delivery attempts so far.
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
}

/// Storage for undelivered envelopes.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Returns up to `limit` undelivered entries in sequence order.
    async fn pending(&self, limit: u32) -> StorageResult<Vec<OutboxEntry>>;

    /// Marks an entry delivered. Marking twice is a no-op.
    async fn mark_delivered(&self, seq: i64) -> StorageResult<()>;

    /// Records a failed attempt for an entry.
    async fn record_failure(&self, seq: i64, message: &str) -> StorageResult<()>;

    /// Counts undelivered entries.
    async fn pending_count(&self) -> StorageResult<u64>;
}
