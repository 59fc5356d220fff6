//! SQLite backend implementation.
//!
//! The system of record. It supports both in-memory databases (for tests)
//! and file-based databases.
//!
//! # Features
//!
//! - In-memory and file-based modes
//! - Serializable write transactions (`BEGIN IMMEDIATE`)
//! - Transactional outbox for change envelopes
//!
//! # Example
//!
//! ```no_run
//! use workhub_persistence::backends::sqlite::SqliteBackend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::in_memory()?;
//! backend.init_schema()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE employees (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     username TEXT NOT NULL UNIQUE,
//!     phone_number TEXT NOT NULL,      -- indexed, not unique
//!     first_name TEXT, last_name TEXT, email TEXT,
//!     department TEXT, position TEXT,
//!     age INTEGER, salary REAL, hire_date TEXT,
//!     version INTEGER NOT NULL DEFAULT 1,
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//!
//! CREATE TABLE outbox (
//!     seq INTEGER PRIMARY KEY AUTOINCREMENT,
//!     event_id TEXT NOT NULL UNIQUE,
//!     topic TEXT NOT NULL,
//!     payload TEXT NOT NULL,           -- JSON change envelope
//!     attempts INTEGER NOT NULL DEFAULT 0,
//!     last_error TEXT,
//!     created_at TEXT NOT NULL,
//!     delivered_at TEXT
//! );
//! ```

mod backend;
mod outbox;
mod schema;
mod storage;
mod transaction;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use schema::SCHEMA_VERSION;
pub use transaction::SqliteTransaction;
