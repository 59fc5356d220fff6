//! Host configuration.
//!
//! Every option can be given on the command line or through the matching
//! environment variable.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `WORKHUB_DATABASE_URL` | workhub.db | SQLite database path, or `:memory:` |
//! | `WORKHUB_LOG_LEVEL` | info | Log level |
//! | `WORKHUB_ELASTICSEARCH_NODES` | (none) | Comma-separated node URLs; in-memory index when unset |
//! | `WORKHUB_ELASTICSEARCH_USERNAME` | (none) | Basic auth username |
//! | `WORKHUB_ELASTICSEARCH_PASSWORD` | (none) | Basic auth password |
//! | `WORKHUB_INDEX_NAME` | employee | Search index name |
//! | `WORKHUB_MAX_RESULTS` | 10000 | Hits returned per search |
//! | `WORKHUB_TOPIC` | employee | Change-event topic |
//! | `WORKHUB_DELIVERY` | outbox | `outbox` or `direct` |
//! | `WORKHUB_RELAY_BATCH_SIZE` | 100 | Outbox entries per relay pass |
//! | `WORKHUB_RELAY_POLL_MS` | 1000 | Relay sleep when the outbox is empty |

use std::time::Duration;

use clap::{Parser, Subcommand};
use workhub_persistence::ServiceConfig;
use workhub_persistence::messaging::{DeliveryMode, MessagingConfig};

/// Workhub host configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "workhub")]
#[command(about = "Workhub employee record service")]
pub struct ServerConfig {
    /// SQLite database path, or `:memory:`.
    #[arg(long, env = "WORKHUB_DATABASE_URL", default_value = "workhub.db")]
    pub database_url: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "WORKHUB_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Elasticsearch node URLs (comma-separated).
    #[arg(long, env = "WORKHUB_ELASTICSEARCH_NODES")]
    pub elasticsearch_nodes: Option<String>,

    /// Elasticsearch basic auth username.
    #[arg(long, env = "WORKHUB_ELASTICSEARCH_USERNAME")]
    pub elasticsearch_username: Option<String>,

    /// Elasticsearch basic auth password.
    #[arg(long, env = "WORKHUB_ELASTICSEARCH_PASSWORD")]
    pub elasticsearch_password: Option<String>,

    /// Search index name.
    #[arg(long, env = "WORKHUB_INDEX_NAME", default_value = "employee")]
    pub index_name: String,

    /// Maximum hits returned by one search.
    #[arg(long, env = "WORKHUB_MAX_RESULTS", default_value = "10000")]
    pub max_results: u32,

    /// Topic change events are published to.
    #[arg(long, env = "WORKHUB_TOPIC", default_value = "employee")]
    pub topic: String,

    /// Change-event delivery (outbox or direct).
    #[arg(long, env = "WORKHUB_DELIVERY", default_value = "outbox")]
    pub delivery: String,

    /// Outbox entries delivered per relay pass.
    #[arg(long, env = "WORKHUB_RELAY_BATCH_SIZE", default_value = "100")]
    pub relay_batch_size: u32,

    /// Relay sleep in milliseconds when the outbox is empty.
    #[arg(long, env = "WORKHUB_RELAY_POLL_MS", default_value = "1000")]
    pub relay_poll_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// Maintenance commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Deliver outbox entries until interrupted.
    Relay,
    /// Rebuild every search document from the system of record.
    Reindex,
    /// Run a filter (JSON `{"filterMap": ...}`) and print matching documents.
    Search {
        /// The filter expression.
        filter: String,
    },
}

impl ServerConfig {
    /// Validates the configuration and returns every error found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.database_url.trim().is_empty() {
            errors.push("Database URL cannot be empty".to_string());
        }

        if self.delivery_mode().is_none() {
            errors.push(format!(
                "Unknown delivery mode '{}' (expected 'outbox' or 'direct')",
                self.delivery
            ));
        }

        if self.relay_poll_ms == 0 {
            errors.push("Relay poll interval cannot be 0".to_string());
        }

        if self.elasticsearch_username.is_some() != self.elasticsearch_password.is_some() {
            errors.push(
                "Elasticsearch username and password must be given together".to_string(),
            );
        }

        if let Some(nodes) = &self.elasticsearch_nodes {
            if self.node_list(nodes).is_empty() {
                errors.push("Elasticsearch nodes list is empty".to_string());
            }
        }

        errors.extend(self.service_config().validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The parsed delivery mode, if recognised.
    pub fn delivery_mode(&self) -> Option<DeliveryMode> {
        match self.delivery.trim().to_ascii_lowercase().as_str() {
            "outbox" => Some(DeliveryMode::Outbox),
            "direct" => Some(DeliveryMode::Direct),
            _ => None,
        }
    }

    /// Configured Elasticsearch nodes; empty when the in-memory index is used.
    pub fn elasticsearch_nodes(&self) -> Vec<String> {
        self.elasticsearch_nodes
            .as_deref()
            .map(|nodes| self.node_list(nodes))
            .unwrap_or_default()
    }

    /// The library configuration derived from these options.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            index_name: self.index_name.clone(),
            max_results: self.max_results,
            messaging: MessagingConfig {
                topic: self.topic.clone(),
                delivery: self.delivery_mode().unwrap_or_default(),
                relay_batch_size: self.relay_batch_size,
                relay_poll_interval: Duration::from_millis(self.relay_poll_ms),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn node_list(&self, nodes: &str) -> Vec<String> {
        nodes
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["workhub"];
        argv.extend_from_slice(args);
        ServerConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["relay"]);
        assert_eq!(config.database_url, "workhub.db");
        assert_eq!(config.index_name, "employee");
        assert!(matches!(config.command, Command::Relay));
        assert!(config.elasticsearch_nodes().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_service_config_mapping() {
        let config = parse(&[
            "--delivery",
            "direct",
            "--topic",
            "people",
            "--max-results",
            "50",
            "reindex",
        ]);
        let service = config.service_config();
        assert_eq!(service.max_results, 50);
        assert_eq!(service.messaging.topic, "people");
        assert_eq!(service.messaging.delivery, DeliveryMode::Direct);
    }

    #[test]
    fn test_validate_collects_errors() {
        let config = parse(&[
            "--delivery",
            "kafka",
            "--relay-poll-ms",
            "0",
            "--elasticsearch-username",
            "elastic",
            "relay",
        ]);
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_node_list_trims() {
        let config = parse(&[
            "--elasticsearch-nodes",
            " http://a:9200, ,http://b:9200 ",
            "search",
            "{}",
        ]);
        assert_eq!(
            config.elasticsearch_nodes(),
            vec!["http://a:9200".to_string(), "http://b:9200".to_string()]
        );
    }
}
