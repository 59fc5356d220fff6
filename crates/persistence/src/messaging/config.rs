//! Configuration for change-event delivery.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How change envelopes leave the Record Writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Publish after commit through the in-process queue. An envelope is
    /// lost if the queue is full or the process stops before delivery.
    Direct,

    /// Write the envelope to the outbox inside the record transaction and
    /// let [`OutboxRelay`](super::OutboxRelay) deliver it. At-least-once.
    #[default]
    Outbox,
}

/// Retry configuration for failed deliveries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial delay between retries.
    #[serde(with = "crate::config::humantime_serde", default = "default_initial_delay")]
    pub initial_delay: Duration,

    /// Maximum delay between retries.
    #[serde(with = "crate::config::humantime_serde", default = "default_max_delay")]
    pub max_delay: Duration,

    /// Backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// The delay that follows `delay`.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        std::cmp::min(
            Duration::from_secs_f64(delay.as_secs_f64() * self.backoff_multiplier),
            self.max_delay,
        )
    }
}

/// Messaging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Topic every change envelope is published to.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Delivery mode.
    #[serde(default)]
    pub delivery: DeliveryMode,

    /// Capacity of the direct-publish queue. Envelopes beyond it are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Retry policy of the direct publisher.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Maximum outbox entries the relay delivers per pass.
    #[serde(default = "default_relay_batch_size")]
    pub relay_batch_size: u32,

    /// How long the relay sleeps when the outbox is drained.
    #[serde(with = "crate::config::humantime_serde", default = "default_relay_poll_interval")]
    pub relay_poll_interval: Duration,
}

fn default_topic() -> String {
    "employee".to_string()
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_relay_batch_size() -> u32 {
    100
}

fn default_relay_poll_interval() -> Duration {
    Duration::from_secs(1)
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            delivery: DeliveryMode::default(),
            queue_capacity: default_queue_capacity(),
            retry: RetryConfig::default(),
            relay_batch_size: default_relay_batch_size(),
            relay_poll_interval: default_relay_poll_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MessagingConfig::default();
        assert_eq!(config.topic, "employee");
        assert_eq!(config.delivery, DeliveryMode::Outbox);
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_deserialize_humantime() {
        let config: MessagingConfig = serde_json::from_value(serde_json::json!({
            "delivery": "direct",
            "retry": {"initial_delay": "50ms", "max_delay": "2s"},
            "relay_poll_interval": "250ms"
        }))
        .unwrap();
        assert_eq!(config.delivery, DeliveryMode::Direct);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(50));
        assert_eq!(config.retry.max_delay, Duration::from_secs(2));
        assert_eq!(config.relay_poll_interval, Duration::from_millis(250));
        assert_eq!(config.topic, "employee");
    }

    #[test]
    fn test_backoff_capped() {
        let retry = RetryConfig::default();
        assert_eq!(
            retry.next_delay(Duration::from_millis(100)),
            Duration::from_millis(200)
        );
        assert_eq!(retry.next_delay(Duration::from_secs(4)), Duration::from_secs(5));
    }
}
