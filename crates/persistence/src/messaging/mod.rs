//! Change-event messaging.
//!
//! - [`MessageSink`] - A delivery destination
//! - [`ChangePublisher`] - Fire-and-forget queue with a retrying worker
//! - [`OutboxRelay`] - At-least-once delivery of transactional outbox entries
//!
//! Which path envelopes take is chosen by [`DeliveryMode`].

mod config;
mod outbox;
mod publisher;
mod sink;

pub use config::{DeliveryMode, MessagingConfig, RetryConfig};
pub use outbox::{OutboxRelay, RelayReport};
pub use publisher::{ChangePublisher, PublisherStats};
pub use sink::{MessageSink, RecordingSink, TracingSink};
