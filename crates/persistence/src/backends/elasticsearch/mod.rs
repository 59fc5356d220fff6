//! Elasticsearch backend implementation.
//!
//! The production document index. Employee documents live in a single
//! index (by default `employee`) keyed by the record id, so re-indexing a
//! record overwrites its previous document.
//!
//! # Example
//!
//! ```ignore
//! use workhub_persistence::backends::elasticsearch::{ElasticsearchBackend, ElasticsearchConfig};
//! use workhub_persistence::core::SearchIndex;
//!
//! let config = ElasticsearchConfig {
//!     nodes: vec!["http://localhost:9200".to_string()],
//!     ..Default::default()
//! };
//! let backend = ElasticsearchBackend::new(config)?;
//! backend.ensure_index("employee").await?;
//! ```

mod backend;
mod index;
mod schema;

pub use backend::{ElasticsearchAuth, ElasticsearchBackend, ElasticsearchConfig, IndexSettings};
pub use schema::create_index_mapping;
