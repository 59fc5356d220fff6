//! Workhub Persistence Layer
//!
//! This crate keeps employee records in a transactional system of record,
//! publishes a change event for every write, and maintains a search index
//! that answers structured filter queries.
//!
//! # Features
//!
//! - **Serializable writes**: Create, update and bulk update run in one
//!   serializable transaction each, with uniqueness checks inside it
//! - **Change events**: One envelope per mutated record, delivered through a
//!   transactional outbox or a fire-and-forget publisher
//! - **Structured search**: `EQUAL` / `GREATER` / `LESS` filters compiled into
//!   the Elasticsearch Query DSL
//!
//! # Backend Features
//!
//! - `sqlite` (default) - SQLite system of record with in-memory and file modes
//! - `elasticsearch` - Elasticsearch search index
//!
//! An in-memory search index is always available.
//!
//! # Architecture
//!
//! - [`types`] - Records, write requests, envelopes, documents and filters
//! - [`error`] - Error types for all operations
//! - [`core`] - Storage, transaction, outbox and search index traits
//! - [`backends`] - Backend implementations
//! - [`search`] - Field conversion and filter compilation
//! - [`messaging`] - Change publisher and outbox relay
//! - [`service`] - Record Writer, Index Synchronizer, Search Executor
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use workhub_persistence::ServiceConfig;
//! use workhub_persistence::backends::memory::InMemorySearchIndex;
//! use workhub_persistence::backends::sqlite::SqliteBackend;
//! use workhub_persistence::service::{ChangeDelivery, EmployeeService};
//! use workhub_persistence::types::EmployeeDto;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(SqliteBackend::in_memory()?);
//! backend.init_schema()?;
//!
//! let config = ServiceConfig::default();
//! let delivery = ChangeDelivery::Outbox {
//!     topic: config.messaging.topic.clone(),
//! };
//! let service = EmployeeService::new(
//!     backend,
//!     Arc::new(InMemorySearchIndex::new()),
//!     delivery,
//!     &config,
//! );
//!
//! let created = service.create(EmployeeDto::new("jdoe", "555-0100")).await?;
//! assert_eq!(created.version, 1);
//! # Ok(())
//! # }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod core;
pub mod error;
pub mod messaging;
pub mod search;
pub mod service;
pub mod types;

// Re-export commonly used types at crate root
pub use config::ServiceConfig;
pub use error::{ErrorCategory, StorageError, StorageResult};
pub use types::{ChangeEnvelope, Employee, EmployeeDocument, EmployeeDto, FilterEmployee};

// Re-export core traits
pub use core::{
    Backend, BackendKind, EmployeeStorage, EmployeeTransaction, OutboxStore, SearchIndex,
    TransactionProvider,
};

pub use service::{ChangeDelivery, EmployeeService};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
