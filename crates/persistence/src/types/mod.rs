//! Core types for the persistence layer.
//!
//! This module provides the fundamental types used throughout the persistence layer:
//!
//! - [`Employee`], [`EmployeeDto`], [`NewEmployee`] - The system-of-record entity and its write requests
//! - [`ChangeEnvelope`] - Change events published after writes
//! - [`EmployeeDocument`] - The search-index projection of an employee
//! - [`FilterEmployee`] - Structured search filters
//! - [`AcceptedField`], [`BulkEmployeeUpdate`] - Bulk partial update directives
//!
//! # Examples
//!
//! ## Building a Filter
//!
//! ```
//! use workhub_persistence::search::DocumentField;
//! use workhub_persistence::types::{FilterEmployee, FilterOperator};
//!
//! let filter = FilterEmployee::new()
//!     .equal(DocumentField::Department, ["Engineering", "Research"])
//!     .greater(DocumentField::Age, "30");
//!
//! assert_eq!(filter.triples().count(), 2);
//! assert_eq!(filter.triples().next().unwrap().0, FilterOperator::Equal);
//! ```
//!
//! ## Bulk Directives
//!
//! ```
//! use workhub_persistence::types::{AcceptedField, BulkEmployeeUpdate};
//!
//! let bulk = BulkEmployeeUpdate::new(vec![1, 2, 2])
//!     .with_field(AcceptedField::Department, "Operations");
//!
//! assert_eq!(bulk.duplicate_ids(), vec![2]);
//! ```

mod accepted_fields;
mod document;
mod employee;
mod envelope;
mod filter;

pub use accepted_fields::{AcceptedField, BulkEmployeeUpdate};
pub use document::EmployeeDocument;
pub use employee::{Employee, EmployeeDto, EmployeeFields, NewEmployee};
pub use envelope::{ChangeEnvelope, EntityType, OperationType};
pub use filter::{FilterEmployee, FilterOperator, RawFilterEmployee};
