//! Core storage traits and abstractions.
//!
//! This module provides the foundational traits for the persistence layer:
//!
//! - [`Backend`] - Lifecycle shared by every backend
//! - [`EmployeeStorage`] - Committed reads from the system of record
//! - [`TransactionProvider`] / [`EmployeeTransaction`] - Serializable writes
//! - [`OutboxStore`] - Envelopes persisted with their writes
//! - [`SearchIndex`] - The document index
//!
//! # Trait Hierarchy
//!
//! ```text
//! Backend
//!
//! EmployeeStorage
//!     └── TransactionProvider ──> EmployeeTransaction
//!
//! OutboxStore
//!
//! SearchIndex
//! ```

pub mod backend;
pub mod index;
pub mod outbox;
pub mod storage;
pub mod transaction;

// Re-export main types
pub use backend::{Backend, BackendKind};
pub use index::{SearchHit, SearchIndex};
pub use outbox::{OutboxEntry, OutboxStore};
pub use storage::EmployeeStorage;
pub use transaction::{EmployeeTransaction, TransactionProvider};
