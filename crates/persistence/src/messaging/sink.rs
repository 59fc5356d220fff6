//! Message sinks: where change envelopes are finally delivered.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{MessagingError, MessagingResult};
use crate::types::ChangeEnvelope;

/// A destination for change envelopes (a broker producer, a log, a test
/// recorder).
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Returns a human-readable name for this sink.
    fn name(&self) -> &'static str;

    /// Delivers one envelope to `topic`.
    async fn send(&self, topic: &str, envelope: &ChangeEnvelope) -> MessagingResult<()>;
}

/// Keeps every delivered envelope in memory.
///
/// Can be told to fail a number of upcoming sends, which is how delivery
/// retries and relay recovery are exercised.
#[derive(Debug, Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<(String, ChangeEnvelope)>>,
    failures_remaining: AtomicU32,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `n` sends.
    pub fn fail_next(&self, n: u32) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    /// All delivered `(topic, envelope)` pairs in delivery order.
    pub fn delivered(&self) -> Vec<(String, ChangeEnvelope)> {
        self.delivered.lock().clone()
    }

    /// Delivered envelopes only.
    pub fn envelopes(&self) -> Vec<ChangeEnvelope> {
        self.delivered
            .lock()
            .iter()
            .map(|(_, envelope)| envelope.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.delivered.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.delivered.lock().is_empty()
    }

    fn take_failure(&self) -> bool {
        self.failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, topic: &str, envelope: &ChangeEnvelope) -> MessagingResult<()> {
        if self.take_failure() {
            return Err(MessagingError::DeliveryFailed {
                topic: topic.to_string(),
                message: "injected failure".to_string(),
            });
        }
        self.delivered
            .lock()
            .push((topic.to_string(), envelope.clone()));
        Ok(())
    }
}

/// Writes each envelope to the log as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl MessageSink for TracingSink {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn send(&self, topic: &str, envelope: &ChangeEnvelope) -> MessagingResult<()> {
        let payload = serde_json::to_string(envelope).map_err(|e| MessagingError::Encoding {
            message: e.to_string(),
        })?;
        tracing::info!(
            topic = %topic,
            key = %envelope.key(),
            event_id = %envelope.event_id(),
            operation = %envelope.operation_type(),
            payload = %payload,
            "Change event"
        );
        Ok(())
    }
}
