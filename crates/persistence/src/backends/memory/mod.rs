//! In-memory search index.
//!
//! Used by tests and by the binary when no Elasticsearch node is configured.

mod index;

pub use index::InMemorySearchIndex;
