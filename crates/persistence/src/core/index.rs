//! Search index abstraction.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::IndexResult;
use crate::search::CompiledQuery;

/// A single search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Document id.
    pub id: String,
    /// Stored document source.
    pub source: Value,
}

/// A document index that can be written by id and queried with a
/// [`CompiledQuery`].
///
/// Implementations must treat `upsert` as idempotent: writing the same
/// source under the same id twice leaves one document.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Returns a human-readable name for this index backend.
    fn backend_name(&self) -> &'static str;

    /// Creates `index` with the employee mapping if it does not exist.
    async fn ensure_index(&self, index: &str) -> IndexResult<()>;

    /// Inserts or replaces the document `id`. Returns the stored id.
    async fn upsert(&self, index: &str, id: &str, source: &Value) -> IndexResult<String>;

    /// Executes `query` and returns matching documents.
    async fn search(&self, index: &str, query: &CompiledQuery) -> IndexResult<Vec<SearchHit>>;

    /// Makes recent writes visible to search.
    async fn refresh(&self, index: &str) -> IndexResult<()>;
}
