//! Error types for the persistence layer.
//!
//! This module defines all error types used throughout the persistence layer,
//! following a hierarchy that separates record errors, validation errors,
//! search errors, indexing errors and messaging errors.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

/// The primary error type for all storage operations.
///
/// This enum encompasses all possible errors that can occur during persistence
/// operations, organized by category.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Record state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Concurrency errors
    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Filter compilation errors
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Search index errors
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Message channel errors
    #[error(transparent)]
    Messaging(#[from] MessagingError),

    /// Transaction errors
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors related to record state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested record was not found.
    #[error("{entity} not found: {key}={value}")]
    NotFound {
        entity: String,
        key: String,
        value: String,
    },

    /// A record colliding with a uniqueness constraint already exists.
    #[error("{entity} already exists: {key}={value}")]
    AlreadyExists {
        entity: String,
        key: String,
        value: String,
    },
}

impl ResourceError {
    /// Shorthand for an employee lookup miss.
    pub fn employee_not_found(key: &str, value: impl fmt::Display) -> Self {
        ResourceError::NotFound {
            entity: "employee".to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    /// Shorthand for an employee uniqueness collision.
    pub fn employee_exists(key: &str, value: impl fmt::Display) -> Self {
        ResourceError::AlreadyExists {
            entity: "employee".to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Errors related to concurrency control.
#[derive(Error, Debug)]
pub enum ConcurrencyError {
    /// The database aborted the transaction to preserve serializability.
    /// The caller may retry the whole operation.
    #[error("serialization failure during {operation}: {message}")]
    SerializationFailure { operation: String, message: String },
}

/// Errors related to request validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The caller attempted to change a field that is immutable after creation.
    #[error("cannot update {field}: field is immutable")]
    ImmutableField { field: String },

    /// A batch contained the same identity more than once.
    #[error("duplicate employee ids in batch: {ids:?}")]
    DuplicateIds { ids: Vec<i64> },

    /// Missing required field.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    /// A raw value could not be parsed into the field's type.
    #[error("invalid value '{value}' for field {field}: {message}")]
    InvalidFieldValue {
        field: String,
        value: String,
        message: String,
    },

    /// The field is not on the bulk-update whitelist.
    #[error("field not accepted for bulk update: {field}")]
    UnacceptedField { field: String },
}

/// Errors raised while compiling a filter expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The filter used an operator outside the supported set.
    #[error("unsupported filter operator: {operator}")]
    UnsupportedOperator { operator: String },

    /// The filter referenced a field the document does not have.
    #[error("unknown document field: {field}")]
    UnknownField { field: String },

    /// The field does not support the requested comparison.
    #[error("field {field} does not support {operator} comparisons")]
    UnsupportedComparison { field: String, operator: String },

    /// A raw filter value could not be converted to the field's type.
    #[error("invalid value '{value}' for field {field}: {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// A range operator was given no value to compare against.
    #[error("{operator} on field {field} requires at least one value")]
    MissingValue { field: String, operator: String },
}

/// Errors raised by the search index.
///
/// These are the "indexing failure" outcomes: the caller learns that the
/// index could not answer, which is distinct from an empty result.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The index backend could not be reached or refused the request.
    #[error("search index {backend_name} unavailable: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// The backend accepted the request but reported a failure.
    #[error("search index {backend_name} rejected request: {message}")]
    Rejected {
        backend_name: String,
        message: String,
    },

    /// A document could not be serialized to, or deserialized from, the index format.
    #[error("document serialization error: {message}")]
    Serialization { message: String },
}

/// Errors raised by the message channel.
#[derive(Error, Debug)]
pub enum MessagingError {
    /// The sink refused or failed to deliver the envelope.
    #[error("delivery to topic {topic} failed: {message}")]
    DeliveryFailed { topic: String, message: String },

    /// The envelope could not be encoded for the channel.
    #[error("envelope encoding error: {message}")]
    Encoding { message: String },
}

/// Errors related to transactions.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// Transaction was rolled back.
    #[error("transaction rolled back: {reason}")]
    RolledBack { reason: String },

    /// The transaction was already committed or rolled back.
    #[error("transaction is no longer active")]
    InvalidTransaction,
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend_name}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Coarse error classification for callers that map errors onto a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A uniqueness constraint was violated.
    Conflict,
    /// The addressed record does not exist.
    NotFound,
    /// The request itself is invalid.
    BadRequest,
    /// The operation was aborted and may succeed if retried.
    Retriable,
    /// The search index could not answer; absence of results is unknown.
    IndexUnavailable,
    /// Anything else.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Conflict => write!(f, "conflict"),
            ErrorCategory::NotFound => write!(f, "not-found"),
            ErrorCategory::BadRequest => write!(f, "bad-request"),
            ErrorCategory::Retriable => write!(f, "retriable"),
            ErrorCategory::IndexUnavailable => write!(f, "index-unavailable"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

impl StorageError {
    /// Classifies this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            StorageError::Resource(ResourceError::NotFound { .. }) => ErrorCategory::NotFound,
            StorageError::Resource(ResourceError::AlreadyExists { .. }) => ErrorCategory::Conflict,
            StorageError::Validation(_) | StorageError::Search(_) => ErrorCategory::BadRequest,
            StorageError::Concurrency(_) => ErrorCategory::Retriable,
            StorageError::Index(_) => ErrorCategory::IndexUnavailable,
            StorageError::Messaging(_)
            | StorageError::Transaction(_)
            | StorageError::Backend(_) => ErrorCategory::Internal,
        }
    }

    /// Returns true when the whole operation may be retried.
    pub fn is_retriable(&self) -> bool {
        self.category() == ErrorCategory::Retriable
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for filter compilation.
pub type SearchResult<T> = Result<T, SearchError>;

/// Result type alias for search index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Result type alias for message channel operations.
pub type MessagingResult<T> = Result<T, MessagingError>;

// Implement conversions from common error types

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, _) = &err {
            if matches!(
                code.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ) {
                return StorageError::Concurrency(ConcurrencyError::SerializationFailure {
                    operation: "sqlite".to_string(),
                    message: err.to_string(),
                });
            }
        }
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(_err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Resource(ResourceError::employee_not_found("id", 42));
        assert_eq!(err.to_string(), "employee not found: id=42");
    }

    #[test]
    fn test_conflict_display() {
        let err = ResourceError::employee_exists("phone_number", "555-0100");
        assert_eq!(
            err.to_string(),
            "employee already exists: phone_number=555-0100"
        );
    }

    #[test]
    fn test_categories() {
        let not_found: StorageError = ResourceError::employee_not_found("id", 1).into();
        assert_eq!(not_found.category(), ErrorCategory::NotFound);

        let conflict: StorageError = ResourceError::employee_exists("phone_number", "1").into();
        assert_eq!(conflict.category(), ErrorCategory::Conflict);

        let bad: StorageError = ValidationError::DuplicateIds { ids: vec![1] }.into();
        assert_eq!(bad.category(), ErrorCategory::BadRequest);

        let filter: StorageError = SearchError::UnsupportedOperator {
            operator: "BETWEEN".to_string(),
        }
        .into();
        assert_eq!(filter.category(), ErrorCategory::BadRequest);

        let index: StorageError = IndexError::Unavailable {
            backend_name: "memory".to_string(),
            message: "down".to_string(),
        }
        .into();
        assert_eq!(index.category(), ErrorCategory::IndexUnavailable);
    }

    #[test]
    fn test_serialization_failure_is_retriable() {
        let err: StorageError = ConcurrencyError::SerializationFailure {
            operation: "create".to_string(),
            message: "database is locked".to_string(),
        }
        .into();
        assert!(err.is_retriable());
        assert_eq!(err.category().to_string(), "retriable");
    }

    #[test]
    fn test_search_error_display() {
        let err = SearchError::UnsupportedComparison {
            field: "department".to_string(),
            operator: "GREATER".to_string(),
        };
        assert!(err.to_string().contains("does not support GREATER"));
    }
}
