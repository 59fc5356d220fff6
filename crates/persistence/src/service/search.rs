//! Search Executor.

use std::sync::Arc;

use tracing::{debug, error};

use crate::core::SearchIndex;
use crate::error::{IndexError, StorageError, StorageResult};
use crate::search::EmployeeQueryBuilder;
use crate::types::{EmployeeDocument, FilterEmployee};

/// Runs compiled filters against the search index.
///
/// Results come from the index only; they may lag the system of record.
/// An index failure is reported as an error, never as an empty result.
#[derive(Clone)]
pub struct SearchExecutor {
    index: Arc<dyn SearchIndex>,
    index_name: String,
    max_results: u32,
}

impl std::fmt::Debug for SearchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchExecutor")
            .field("backend", &self.index.backend_name())
            .field("index_name", &self.index_name)
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl SearchExecutor {
    pub fn new(
        index: Arc<dyn SearchIndex>,
        index_name: impl Into<String>,
        max_results: u32,
    ) -> Self {
        Self {
            index,
            index_name: index_name.into(),
            max_results,
        }
    }

    pub fn max_results(&self) -> u32 {
        self.max_results
    }

    /// Returns every document matching all of `filter`'s conditions, up to
    /// `max_results`.
    ///
    /// # Errors
    ///
    /// * `StorageError::Search` - the filter does not compile
    /// * `StorageError::Index` - the index could not be queried or returned
    ///   an unreadable document
    pub async fn search(&self, filter: &FilterEmployee) -> StorageResult<Vec<EmployeeDocument>> {
        let query = EmployeeQueryBuilder::new(filter)
            .max_results(self.max_results)
            .build()?;

        debug!(index = %self.index_name, query = %query.body(), "Executing employee search");

        let hits = self
            .index
            .search(&self.index_name, &query)
            .await
            .map_err(|e| {
                error!(
                    backend = self.index.backend_name(),
                    index = %self.index_name,
                    error = %e,
                    "Employee search failed"
                );
                StorageError::Index(e)
            })?;

        let documents = hits
            .into_iter()
            .map(|hit| {
                serde_json::from_value::<EmployeeDocument>(hit.source).map_err(|e| {
                    error!(
                        index = %self.index_name,
                        id = %hit.id,
                        error = %e,
                        "Unreadable search hit"
                    );
                    IndexError::Serialization {
                        message: format!("document {}: {}", hit.id, e),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(index = %self.index_name, hits = documents.len(), "Employee search complete");
        Ok(documents)
    }
}
