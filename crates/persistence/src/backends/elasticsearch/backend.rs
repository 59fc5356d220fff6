//! Connection to the Elasticsearch cluster holding employee documents.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use elasticsearch::Elasticsearch;
use elasticsearch::auth::Credentials;
use elasticsearch::cluster::ClusterHealthParts;
use elasticsearch::http::Url;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{Backend, BackendKind};
use crate::error::{BackendError, StorageError, StorageResult};

/// Credentials sent with every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElasticsearchAuth {
    Basic { username: String, password: String },
    Bearer { token: String },
}

impl ElasticsearchAuth {
    fn credentials(&self) -> Credentials {
        match self {
            ElasticsearchAuth::Basic { username, password } => {
                Credentials::Basic(username.clone(), password.clone())
            }
            ElasticsearchAuth::Bearer { token } => Credentials::Bearer(token.clone()),
        }
    }
}

/// Settings applied when the employee index is created. An existing index
/// keeps whatever settings it was created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
    pub refresh_interval: String,
    /// Upper bound on `from + size` of one search; must cover the
    /// service's `max_results`.
    pub max_result_window: u32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            number_of_shards: 1,
            number_of_replicas: 1,
            refresh_interval: "1s".to_string(),
            max_result_window: 10_000,
        }
    }
}

/// Elasticsearch connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Node URLs. Requests go to the first one.
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Per-request timeout, e.g. `"30s"`.
    #[serde(
        with = "crate::config::humantime_serde",
        default = "default_request_timeout"
    )]
    pub request_timeout: Duration,

    #[serde(default)]
    pub auth: Option<ElasticsearchAuth>,

    #[serde(default)]
    pub index: IndexSettings,
}

fn default_nodes() -> Vec<String> {
    vec!["http://localhost:9200".to_string()]
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            request_timeout: default_request_timeout(),
            auth: None,
            index: IndexSettings::default(),
        }
    }
}

fn connection_failed(message: String) -> StorageError {
    StorageError::Backend(BackendError::ConnectionFailed {
        backend_name: "elasticsearch".to_string(),
        message,
    })
}

fn unavailable(message: String) -> BackendError {
    BackendError::Unavailable {
        backend_name: "elasticsearch".to_string(),
        message,
    }
}

/// The subset of `_cluster/health` this backend reads.
#[derive(Debug, Deserialize)]
struct ClusterHealth {
    status: String,
}

/// Elasticsearch document index for employees.
///
/// Documents are written explicitly through the index synchronizer; nothing
/// here observes the system of record.
pub struct ElasticsearchBackend {
    client: Elasticsearch,
    config: ElasticsearchConfig,
}

impl Debug for ElasticsearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchBackend")
            .field("nodes", &self.config.nodes)
            .field("index", &self.config.index)
            .finish_non_exhaustive()
    }
}

impl ElasticsearchBackend {
    /// Builds a client for the first configured node. No request is sent
    /// until the backend is used.
    pub fn new(config: ElasticsearchConfig) -> StorageResult<Self> {
        let node = config
            .nodes
            .first()
            .ok_or_else(|| connection_failed("no Elasticsearch node configured".to_string()))?;
        let url: Url = node
            .parse()
            .map_err(|e| connection_failed(format!("invalid node URL {}: {}", node, e)))?;
        if config.nodes.len() > 1 {
            debug!(
                node = %node,
                ignored = config.nodes.len() - 1,
                "Using first Elasticsearch node"
            );
        }

        let mut builder = TransportBuilder::new(SingleNodeConnectionPool::new(url))
            .timeout(config.request_timeout);
        if let Some(auth) = &config.auth {
            builder = builder.auth(auth.credentials());
        }
        let transport = builder
            .build()
            .map_err(|e| connection_failed(format!("failed to build transport: {}", e)))?;

        Ok(Self {
            client: Elasticsearch::new(transport),
            config,
        })
    }

    pub(crate) fn client(&self) -> &Elasticsearch {
        &self.client
    }

    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }
}

#[async_trait]
impl Backend for ElasticsearchBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Elasticsearch
    }

    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    /// Reachable and not `red`. A `yellow` single-node cluster is healthy.
    async fn health_check(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| unavailable(format!("cluster health request failed: {}", e)))?;

        let status = response.status_code();
        if !status.is_success() {
            return Err(unavailable(format!("cluster health returned status {}", status)));
        }

        let health: ClusterHealth = response
            .json()
            .await
            .map_err(|e| unavailable(format!("unreadable cluster health: {}", e)))?;

        if health.status == "red" {
            return Err(unavailable("cluster status is red".to_string()));
        }
        Ok(())
    }

    /// Indexes are created on first write; initializing only verifies the
    /// cluster is reachable.
    async fn initialize(&self) -> Result<(), BackendError> {
        self.health_check().await
    }
}
