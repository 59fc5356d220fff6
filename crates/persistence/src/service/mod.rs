//! Employee service components.
//!
//! - [`RecordWriter`] - Conflict-checked transactional writes
//! - [`IndexSynchronizer`] - Explicit document upserts into the search index
//! - [`SearchExecutor`] - Filter compilation and execution against the index
//! - [`EmployeeService`] - A facade wiring all three

mod employee;
mod indexer;
mod search;
mod writer;

pub use employee::EmployeeService;
pub use indexer::IndexSynchronizer;
pub use search::SearchExecutor;
pub use writer::{ChangeDelivery, RecordWriter};
