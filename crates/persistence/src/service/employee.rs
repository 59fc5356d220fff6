//! The employee service facade.
//!
//! Wires the [`RecordWriter`], [`IndexSynchronizer`] and [`SearchExecutor`]
//! over one system of record and one search index. This is the surface a
//! transport layer calls; each method maps one request.

use std::sync::Arc;

use tracing::info;

use crate::config::ServiceConfig;
use crate::core::{EmployeeStorage, SearchIndex, TransactionProvider};
use crate::error::{ResourceError, StorageResult};
use crate::types::{BulkEmployeeUpdate, Employee, EmployeeDocument, EmployeeDto, FilterEmployee};

use super::indexer::IndexSynchronizer;
use super::search::SearchExecutor;
use super::writer::{ChangeDelivery, RecordWriter};

/// Employee record operations.
pub struct EmployeeService<S> {
    storage: Arc<S>,
    writer: RecordWriter<S>,
    indexer: IndexSynchronizer,
    searcher: SearchExecutor,
    reindex_batch_size: u32,
}

impl<S> std::fmt::Debug for EmployeeService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmployeeService")
            .field("writer", &self.writer)
            .field("indexer", &self.indexer)
            .field("searcher", &self.searcher)
            .finish_non_exhaustive()
    }
}

impl<S: TransactionProvider> EmployeeService<S> {
    pub fn new(
        storage: Arc<S>,
        index: Arc<dyn SearchIndex>,
        delivery: ChangeDelivery,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            writer: RecordWriter::new(storage.clone(), delivery, config.transaction_retries),
            indexer: IndexSynchronizer::new(index.clone(), config.index_name.clone()),
            searcher: SearchExecutor::new(index, config.index_name.clone(), config.max_results),
            reindex_batch_size: config.reindex_batch_size.max(1),
            storage,
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn writer(&self) -> &RecordWriter<S> {
        &self.writer
    }

    pub fn indexer(&self) -> &IndexSynchronizer {
        &self.indexer
    }

    pub fn searcher(&self) -> &SearchExecutor {
        &self.searcher
    }

    /// See [`RecordWriter::create`].
    pub async fn create(&self, dto: EmployeeDto) -> StorageResult<Employee> {
        self.writer.create(dto).await
    }

    /// See [`RecordWriter::update_by_identity`].
    pub async fn update_by_identity(&self, dto: EmployeeDto) -> StorageResult<Employee> {
        self.writer.update_by_identity(dto).await
    }

    /// See [`RecordWriter::bulk_apply_fields`].
    pub async fn bulk_apply_fields(
        &self,
        update: &BulkEmployeeUpdate,
    ) -> StorageResult<Vec<Employee>> {
        self.writer.bulk_apply_fields(update).await
    }

    /// Reads a record by id.
    pub async fn get_by_id(&self, id: i64) -> StorageResult<Employee> {
        self.storage
            .find_by_id(id)
            .await?
            .ok_or_else(|| ResourceError::employee_not_found("id", id).into())
    }

    /// Reads a record by username.
    pub async fn get_by_username(&self, username: &str) -> StorageResult<Employee> {
        self.storage
            .find_by_username(username)
            .await?
            .ok_or_else(|| ResourceError::employee_not_found("username", username).into())
    }

    /// See [`IndexSynchronizer::upsert`].
    pub async fn index(&self, document: &EmployeeDocument) -> StorageResult<String> {
        self.indexer.upsert(document).await
    }

    /// Indexes the current state of record `id`.
    pub async fn index_by_id(&self, id: i64) -> StorageResult<String> {
        let employee = self.get_by_id(id).await?;
        self.indexer.index_employee(&employee).await
    }

    /// See [`SearchExecutor::search`].
    pub async fn search(&self, filter: &FilterEmployee) -> StorageResult<Vec<EmployeeDocument>> {
        self.searcher.search(filter).await
    }

    /// Upserts a document for every record, page by page. Returns the
    /// number of documents written.
    pub async fn reindex_all(&self) -> StorageResult<u64> {
        self.indexer.ensure_index().await?;

        let mut offset = 0u64;
        let mut indexed = 0u64;
        loop {
            let page = self.storage.list(offset, self.reindex_batch_size).await?;
            if page.is_empty() {
                break;
            }
            for employee in &page {
                self.indexer.index_employee(employee).await?;
                indexed += 1;
            }
            offset += page.len() as u64;
            if page.len() < self.reindex_batch_size as usize {
                break;
            }
        }

        self.indexer.refresh().await?;
        info!(
            index = %self.indexer.index_name(),
            documents = indexed,
            "Re-indexed employees"
        );
        Ok(indexed)
    }

    /// Stops the direct publisher, if any, after it drains its queue.
    pub async fn shutdown(&self) {
        if let ChangeDelivery::Direct(publisher) = self.writer.delivery() {
            publisher.shutdown().await;
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::backends::memory::InMemorySearchIndex;
    use crate::backends::sqlite::SqliteBackend;
    use crate::error::ErrorCategory;
    use crate::search::DocumentField;
    use crate::types::EmployeeFields;

    fn service() -> EmployeeService<SqliteBackend> {
        let backend = Arc::new(SqliteBackend::in_memory().unwrap());
        backend.init_schema().unwrap();
        let config = ServiceConfig {
            reindex_batch_size: 2,
            ..Default::default()
        };
        EmployeeService::new(
            backend,
            Arc::new(InMemorySearchIndex::new()),
            ChangeDelivery::Outbox {
                topic: "employee".to_string(),
            },
            &config,
        )
    }

    #[tokio::test]
    async fn test_get_by_username_not_found() {
        let service = service();
        let err = service.get_by_username("ghost").await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[tokio::test]
    async fn test_reindex_all_pages() {
        let service = service();
        for i in 0..5 {
            let fields = EmployeeFields {
                department: Some("Eng".to_string()),
                ..Default::default()
            };
            let dto = EmployeeDto::new(format!("u{}", i), format!("555-{}", i)).with_fields(fields);
            service.create(dto).await.unwrap();
        }

        assert_eq!(service.reindex_all().await.unwrap(), 5);
        let hits = service
            .search(&FilterEmployee::new().equal(DocumentField::Department, ["Eng"]))
            .await
            .unwrap();
        assert_eq!(hits.len(), 5);
    }

    #[tokio::test]
    async fn test_index_lags_until_reindexed() {
        let service = service();
        let created = service.create(EmployeeDto::new("jdoe", "555-0100")).await.unwrap();
        assert!(service.search(&FilterEmployee::new()).await.unwrap().is_empty());

        service.index_by_id(created.id).await.unwrap();
        assert_eq!(service.search(&FilterEmployee::new()).await.unwrap().len(), 1);
    }
}
