//! Backend abstraction shared by record stores and search indexes.

use std::fmt::{self, Debug};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Identifies the kind of backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// SQLite system of record (file or in-memory).
    Sqlite,
    /// Elasticsearch search index.
    Elasticsearch,
    /// Process-local search index.
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::Elasticsearch => "elasticsearch",
            BackendKind::Memory => "memory",
        };
        write!(f, "{}", name)
    }
}

/// A backend that can be initialized and health-checked.
///
/// Both the system of record and the search index implement this so the
/// binary can bring them up and probe them uniformly.
#[async_trait]
pub trait Backend: Send + Sync + Debug {
    /// Returns the kind of backend.
    fn kind(&self) -> BackendKind;

    /// Returns a human-readable name for this backend.
    fn name(&self) -> &'static str;

    /// Checks if the backend is reachable.
    async fn health_check(&self) -> Result<(), BackendError>;

    /// Creates the schema or index if missing. Idempotent.
    async fn initialize(&self) -> Result<(), BackendError>;
}
