//! Index Synchronizer.
//!
//! Writes [`EmployeeDocument`]s into the search index. Indexing is explicit:
//! record writes never touch the index, so a document reflects the record as
//! of its last upsert.
//!
//! The index is created with the employee mapping before the first write.
//! Writing into a missing index would let the backend infer a dynamic
//! mapping, and exact-match filters would stop matching.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, error};

use crate::core::SearchIndex;
use crate::error::{IndexError, StorageResult};
use crate::types::{Employee, EmployeeDocument};

/// Upserts employee documents by id.
#[derive(Clone)]
pub struct IndexSynchronizer {
    index: Arc<dyn SearchIndex>,
    index_name: String,
    ready: Arc<OnceCell<()>>,
}

impl std::fmt::Debug for IndexSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexSynchronizer")
            .field("backend", &self.index.backend_name())
            .field("index_name", &self.index_name)
            .field("ready", &self.ready.initialized())
            .finish()
    }
}

impl IndexSynchronizer {
    pub fn new(index: Arc<dyn SearchIndex>, index_name: impl Into<String>) -> Self {
        Self {
            index,
            index_name: index_name.into(),
            ready: Arc::new(OnceCell::new()),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Creates the index with the employee mapping if it is missing.
    ///
    /// Succeeds against the backend at most once per synchronizer and its
    /// clones; a failed attempt is retried on the next call.
    pub async fn ensure_index(&self) -> StorageResult<()> {
        self.ready
            .get_or_try_init(|| async {
                self.index
                    .ensure_index(&self.index_name)
                    .await
                    .map_err(|e| self.failed("ensure_index", e))
            })
            .await?;
        Ok(())
    }

    /// Inserts or replaces `document`, keyed by its id. Returns the stored id.
    ///
    /// Idempotent: upserting the same document twice leaves one document.
    pub async fn upsert(&self, document: &EmployeeDocument) -> StorageResult<String> {
        self.ensure_index().await?;

        let source = serde_json::to_value(document).map_err(|e| {
            self.failed(
                "upsert",
                IndexError::Serialization {
                    message: e.to_string(),
                },
            )
        })?;

        let id = self
            .index
            .upsert(&self.index_name, &document.document_id(), &source)
            .await
            .map_err(|e| self.failed("upsert", e))?;

        debug!(index = %self.index_name, id = %id, "Indexed employee document");
        Ok(id)
    }

    /// Projects `employee` to a document and upserts it.
    pub async fn index_employee(&self, employee: &Employee) -> StorageResult<String> {
        self.upsert(&EmployeeDocument::from(employee)).await
    }

    /// Makes recent upserts visible to search.
    pub async fn refresh(&self) -> StorageResult<()> {
        self.index
            .refresh(&self.index_name)
            .await
            .map_err(|e| self.failed("refresh", e))
    }

    fn failed(&self, operation: &str, err: IndexError) -> crate::error::StorageError {
        error!(
            backend = self.index.backend_name(),
            index = %self.index_name,
            operation = operation,
            error = %err,
            "Search index operation failed"
        );
        err.into()
    }
}
