//! Service configuration.

use serde::{Deserialize, Serialize};

use crate::messaging::MessagingConfig;
use crate::search::DEFAULT_MAX_RESULTS;

/// Configuration for [`EmployeeService`](crate::service::EmployeeService).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Name of the search index holding employee documents.
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Maximum hits returned by one search.
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// How many times a write aborted by a serialization failure is re-run.
    #[serde(default = "default_transaction_retries")]
    pub transaction_retries: u32,

    /// Page size used when re-indexing every record.
    #[serde(default = "default_reindex_batch_size")]
    pub reindex_batch_size: u32,

    /// Change-event delivery.
    #[serde(default)]
    pub messaging: MessagingConfig,
}

fn default_index_name() -> String {
    "employee".to_string()
}

fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

fn default_transaction_retries() -> u32 {
    3
}

fn default_reindex_batch_size() -> u32 {
    500
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            index_name: default_index_name(),
            max_results: default_max_results(),
            transaction_retries: default_transaction_retries(),
            reindex_batch_size: default_reindex_batch_size(),
            messaging: MessagingConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Returns a description of every invalid setting.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.index_name.trim().is_empty() {
            errors.push("index_name must not be empty".to_string());
        }
        if self.max_results == 0 {
            errors.push("max_results must be at least 1".to_string());
        }
        if self.reindex_batch_size == 0 {
            errors.push("reindex_batch_size must be at least 1".to_string());
        }
        if self.messaging.topic.trim().is_empty() {
            errors.push("messaging.topic must not be empty".to_string());
        }
        if self.messaging.queue_capacity == 0 {
            errors.push("messaging.queue_capacity must be at least 1".to_string());
        }
        errors
    }
}

/// Serde module for Duration with humantime format.
pub(crate) mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
