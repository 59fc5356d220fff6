//! Search support: field conversion and filter compilation.
//!
//! - [`converters`] - Maps document fields to index-native types and comparisons
//! - [`query_builder`] - Compiles a [`FilterEmployee`](crate::types::FilterEmployee)
//!   into an Elasticsearch Query DSL body
//!
//! # Example
//!
//! ```
//! use workhub_persistence::search::{DocumentField, EmployeeQueryBuilder};
//! use workhub_persistence::types::FilterEmployee;
//!
//! let filter = FilterEmployee::new()
//!     .equal(DocumentField::Department, ["A", "B"])
//!     .greater(DocumentField::Age, "30");
//!
//! let query = EmployeeQueryBuilder::new(&filter).max_results(100).build().unwrap();
//! assert_eq!(query.query()["bool"]["filter"][0]["range"]["age"]["gt"], 30);
//! ```

pub mod converters;
pub mod query_builder;

pub use converters::{DocumentField, FieldKind};
pub use query_builder::{CompiledQuery, DEFAULT_MAX_RESULTS, EmployeeQueryBuilder, compile};
