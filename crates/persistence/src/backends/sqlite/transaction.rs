//! Transaction support for SQLite backend.
//!
//! Write transactions start with `BEGIN IMMEDIATE`, taking the database
//! write lock up front. Two writers therefore never interleave: the second
//! waits up to the busy timeout and then fails with a retriable
//! serialization failure, which gives serializable behavior for the
//! check-then-write sequences the service runs.

use async_trait::async_trait;
use chrono::Utc;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::core::{EmployeeTransaction, TransactionProvider};
use crate::error::{
    ConcurrencyError, MessagingError, StorageError, StorageResult, TransactionError,
};
use crate::types::{ChangeEnvelope, Employee, NewEmployee};

use super::SqliteBackend;
use super::storage::{EmployeeKey, insert_employee, select_employee, update_employee};

/// A SQLite transaction.
pub struct SqliteTransaction {
    /// The connection used for this transaction.
    conn: PooledConnection<SqliteConnectionManager>,
    /// Whether the transaction is still active.
    active: bool,
}

impl std::fmt::Debug for SqliteTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTransaction")
            .field("active", &self.active)
            .finish()
    }
}

impl SqliteTransaction {
    fn new(conn: PooledConnection<SqliteConnectionManager>) -> StorageResult<Self> {
        conn.execute("BEGIN IMMEDIATE", []).map_err(|e| match StorageError::from(e) {
            StorageError::Concurrency(ConcurrencyError::SerializationFailure { message, .. }) => {
                StorageError::Concurrency(ConcurrencyError::SerializationFailure {
                    operation: "begin".to_string(),
                    message,
                })
            }
            other => StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("Failed to begin transaction: {}", other),
            }),
        })?;

        Ok(Self { conn, active: true })
    }

    fn ensure_active(&self) -> StorageResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(StorageError::Transaction(TransactionError::InvalidTransaction))
        }
    }
}

#[async_trait]
impl EmployeeTransaction for SqliteTransaction {
    async fn find_by_id(&mut self, id: i64) -> StorageResult<Option<Employee>> {
        self.ensure_active()?;
        select_employee(&self.conn, EmployeeKey::Id(id))
    }

    async fn find_by_username(&mut self, username: &str) -> StorageResult<Option<Employee>> {
        self.ensure_active()?;
        select_employee(&self.conn, EmployeeKey::Username(username))
    }

    async fn find_by_phone_number(
        &mut self,
        phone_number: &str,
    ) -> StorageResult<Option<Employee>> {
        self.ensure_active()?;
        select_employee(&self.conn, EmployeeKey::PhoneNumber(phone_number))
    }

    async fn insert(&mut self, employee: &NewEmployee) -> StorageResult<Employee> {
        self.ensure_active()?;
        insert_employee(&self.conn, employee)
    }

    async fn update(&mut self, employee: &Employee) -> StorageResult<Employee> {
        self.ensure_active()?;
        update_employee(&self.conn, employee)
    }

    async fn enqueue_change(
        &mut self,
        topic: &str,
        envelope: &ChangeEnvelope,
    ) -> StorageResult<()> {
        self.ensure_active()?;

        let payload = serde_json::to_string(envelope).map_err(|e| {
            StorageError::Messaging(MessagingError::Encoding {
                message: e.to_string(),
            })
        })?;

        self.conn.execute(
            "INSERT INTO outbox (event_id, topic, payload, attempts, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![
                envelope.event_id().to_string(),
                topic,
                payload,
                Utc::now().to_rfc3339()
            ],
        )?;

        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        self.ensure_active()?;

        self.conn
            .execute("COMMIT", [])
            .map_err(|e| match StorageError::from(e) {
                err @ StorageError::Concurrency(_) => err,
                other => StorageError::Transaction(TransactionError::RolledBack {
                    reason: format!("Commit failed: {}", other),
                }),
            })?;

        self.active = false;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        self.ensure_active()?;

        self.conn.execute("ROLLBACK", []).map_err(|e| {
            StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("Rollback failed: {}", e),
            })
        })?;

        self.active = false;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        // Not committed or rolled back explicitly
        if self.active {
            let _ = self.conn.execute("ROLLBACK", []);
        }
    }
}

#[async_trait]
impl TransactionProvider for SqliteBackend {
    type Transaction = SqliteTransaction;

    async fn begin_transaction(&self) -> StorageResult<Self::Transaction> {
        let conn = self.get_connection()?;
        SqliteTransaction::new(conn)
    }
}
