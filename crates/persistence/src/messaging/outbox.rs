//! Outbox relay.
//!
//! Drains envelopes persisted by write transactions to a [`MessageSink`].
//! An entry is marked delivered only after the sink accepts it, so a crash
//! between send and mark re-delivers it: consumers see each event at least
//! once and deduplicate by `event_id`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::core::OutboxStore;
use crate::error::StorageResult;

use super::config::MessagingConfig;
use super::sink::MessageSink;

/// Outcome of one relay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    /// Entries delivered in this pass.
    pub delivered: usize,
    /// Whether the pass stopped on a failed delivery.
    pub stalled: bool,
}

/// Moves outbox entries to a sink in sequence order.
pub struct OutboxRelay {
    store: Arc<dyn OutboxStore>,
    sink: Arc<dyn MessageSink>,
    batch_size: u32,
    poll_interval: Duration,
}

impl std::fmt::Debug for OutboxRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboxRelay")
            .field("sink", &self.sink.name())
            .field("batch_size", &self.batch_size)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl OutboxRelay {
    pub fn new(
        store: Arc<dyn OutboxStore>,
        sink: Arc<dyn MessageSink>,
        config: &MessagingConfig,
    ) -> Self {
        Self {
            store,
            sink,
            batch_size: config.relay_batch_size.max(1),
            poll_interval: config.relay_poll_interval,
        }
    }

    /// Delivers up to one batch of pending entries.
    ///
    /// Stops at the first failed delivery so that later entries never
    /// overtake an earlier one; the failed entry is retried next pass.
    pub async fn drain_once(&self) -> StorageResult<RelayReport> {
        let pending = self.store.pending(self.batch_size).await?;
        let mut report = RelayReport::default();

        for entry in pending {
            match self.sink.send(&entry.topic, &entry.envelope).await {
                Ok(()) => {
                    self.store.mark_delivered(entry.seq).await?;
                    report.delivered += 1;
                }
                Err(e) => {
                    error!(
                        seq = entry.seq,
                        event_id = %entry.event_id,
                        attempts = entry.attempts + 1,
                        error = %e,
                        "Outbox delivery failed"
                    );
                    self.store.record_failure(entry.seq, &e.to_string()).await?;
                    report.stalled = true;
                    break;
                }
            }
        }

        if report.delivered > 0 {
            debug!(delivered = report.delivered, "Outbox pass complete");
        }
        Ok(report)
    }

    /// Drains until the outbox is empty or a delivery fails.
    pub async fn drain(&self) -> StorageResult<usize> {
        let mut total = 0;
        loop {
            let report = self.drain_once().await?;
            total += report.delivered;
            if report.stalled || report.delivered < self.batch_size as usize {
                return Ok(total);
            }
        }
    }

    /// Runs until `shutdown` becomes `true`, sleeping between empty passes.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> StorageResult<()> {
        info!(sink = self.sink.name(), "Outbox relay started");

        while !*shutdown.borrow() {
            let busy = match self.drain_once().await {
                Ok(report) => !report.stalled && report.delivered == self.batch_size as usize,
                Err(e) => {
                    error!(error = %e, "Outbox relay pass failed");
                    false
                }
            };

            if busy {
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Outbox relay stopped");
        Ok(())
    }
}
