//! Fire-and-forget change publisher.
//!
//! [`ChangePublisher::publish`] never blocks the caller: it enqueues the
//! envelope on a bounded channel and returns. A background worker delivers
//! queued envelopes to the sink with exponential-backoff retries. A full or
//! closed queue drops the envelope with a warning.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::error::MessagingResult;
use crate::types::ChangeEnvelope;

use super::config::{MessagingConfig, RetryConfig};
use super::sink::MessageSink;

/// Delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    /// Envelopes accepted onto the queue.
    pub published: u64,
    /// Envelopes the sink accepted.
    pub delivered: u64,
    /// Envelopes given up on after all retries.
    pub failed: u64,
    /// Envelopes never queued (queue full or closed).
    pub dropped: u64,
}

impl PublisherStats {
    /// Envelopes queued but not yet delivered or failed.
    pub fn in_flight(&self) -> u64 {
        self.published
            .saturating_sub(self.delivered)
            .saturating_sub(self.failed)
    }
}

/// Publishes change envelopes through a background worker.
pub struct ChangePublisher {
    topic: String,
    sender: Mutex<Option<mpsc::Sender<ChangeEnvelope>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<RwLock<PublisherStats>>,
}

impl std::fmt::Debug for ChangePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangePublisher")
            .field("topic", &self.topic)
            .field("stats", &*self.stats.read())
            .finish_non_exhaustive()
    }
}

impl ChangePublisher {
    /// Spawns the delivery worker. Must be called inside a tokio runtime.
    pub fn start(sink: Arc<dyn MessageSink>, config: &MessagingConfig) -> Self {
        let (sender, receiver) = mpsc::channel::<ChangeEnvelope>(config.queue_capacity.max(1));
        let stats = Arc::new(RwLock::new(PublisherStats::default()));

        let worker = tokio::spawn(Self::worker(
            receiver,
            sink,
            config.topic.clone(),
            config.retry.clone(),
            stats.clone(),
        ));

        Self {
            topic: config.topic.clone(),
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            stats,
        }
    }

    /// The topic envelopes are published to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Queues `envelope` for delivery. Never blocks and never fails the
    /// caller; returns whether the envelope was queued.
    pub fn publish(&self, envelope: ChangeEnvelope) -> bool {
        let event_id = envelope.event_id();
        let result = match self.sender.lock().as_ref() {
            Some(sender) => sender.try_send(envelope),
            None => Err(TrySendError::Closed(envelope)),
        };

        let mut stats = self.stats.write();
        match result {
            Ok(()) => {
                stats.published += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                stats.dropped += 1;
                warn!(
                    topic = %self.topic,
                    event_id = %event_id,
                    "Publish queue full, dropping change event"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                stats.dropped += 1;
                warn!(
                    topic = %self.topic,
                    event_id = %event_id,
                    "Publisher stopped, dropping change event"
                );
                false
            }
        }
    }

    /// Current counters.
    pub fn stats(&self) -> PublisherStats {
        *self.stats.read()
    }

    /// Stops accepting envelopes and waits until everything queued has been
    /// delivered or given up on.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "Publisher worker panicked");
            }
        }
    }

    async fn worker(
        mut receiver: mpsc::Receiver<ChangeEnvelope>,
        sink: Arc<dyn MessageSink>,
        topic: String,
        retry: RetryConfig,
        stats: Arc<RwLock<PublisherStats>>,
    ) {
        while let Some(envelope) = receiver.recv().await {
            match deliver_with_retry(sink.as_ref(), &topic, &envelope, &retry).await {
                Ok(()) => {
                    stats.write().delivered += 1;
                }
                Err(e) => {
                    stats.write().failed += 1;
                    error!(
                        sink = sink.name(),
                        topic = %topic,
                        event_id = %envelope.event_id(),
                        error = %e,
                        "Change event delivery failed"
                    );
                }
            }
        }
        debug!(topic = %topic, "Publisher worker stopped");
    }
}

/// Sends one envelope, retrying with exponential backoff.
pub(crate) async fn deliver_with_retry(
    sink: &dyn MessageSink,
    topic: &str,
    envelope: &ChangeEnvelope,
    retry: &RetryConfig,
) -> MessagingResult<()> {
    let mut delay = retry.initial_delay;
    let mut attempts = 0;

    loop {
        attempts += 1;

        match sink.send(topic, envelope).await {
            Ok(()) => {
                if attempts > 1 {
                    debug!(attempts = attempts, "Delivery succeeded after retries");
                }
                return Ok(());
            }
            Err(e) => {
                if attempts > retry.max_retries {
                    return Err(e);
                }

                warn!(
                    attempt = attempts,
                    max_retries = retry.max_retries,
                    delay_ms = delay.as_millis(),
                    error = %e,
                    "Delivery attempt failed, retrying"
                );

                sleep(delay).await;
                delay = retry.next_delay(delay);
            }
        }
    }
}
