//! Transaction traits for atomic record writes.
//!
//! A transaction groups the existence checks, the writes and the outbox
//! entries of one service operation so they commit or roll back together.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::{ChangeEnvelope, Employee, NewEmployee};

use super::storage::EmployeeStorage;

/// An active database transaction.
///
/// Changes are only persisted when `commit()` is called. Dropping an active
/// transaction rolls it back.
///
/// # Example
///
/// ```ignore
/// use workhub_persistence::core::{EmployeeTransaction, TransactionProvider};
///
/// async fn rename<S: TransactionProvider>(storage: &S, id: i64) -> StorageResult<()> {
///     let mut tx = storage.begin_transaction().await?;
///     let mut employee = tx.find_by_id(id).await?.unwrap();
///     employee.fields.last_name = Some("Smith".to_string());
///     tx.update(&employee).await?;
///     Box::new(tx).commit().await
/// }
/// ```
#[async_trait]
pub trait EmployeeTransaction: Send {
    /// Reads an employee by identity, seeing uncommitted changes of this transaction.
    async fn find_by_id(&mut self, id: i64) -> StorageResult<Option<Employee>>;

    /// Reads an employee by username.
    async fn find_by_username(&mut self, username: &str) -> StorageResult<Option<Employee>>;

    /// Reads an employee by phone number.
    async fn find_by_phone_number(&mut self, phone_number: &str)
    -> StorageResult<Option<Employee>>;

    /// Inserts a new employee and returns it with its assigned identity.
    async fn insert(&mut self, employee: &NewEmployee) -> StorageResult<Employee>;

    /// Overwrites the mutable state of an existing employee.
    ///
    /// `id` and `username` are taken from the stored row, never from
    /// `employee`. Returns the persisted record with its version bumped.
    async fn update(&mut self, employee: &Employee) -> StorageResult<Employee>;

    /// Queues `envelope` for delivery on `topic` once this transaction commits.
    async fn enqueue_change(&mut self, topic: &str, envelope: &ChangeEnvelope)
    -> StorageResult<()>;

    /// Commits the transaction, persisting all changes.
    async fn commit(self: Box<Self>) -> StorageResult<()>;

    /// Rolls back the transaction, discarding all changes.
    async fn rollback(self: Box<Self>) -> StorageResult<()>;

    /// Returns whether this transaction is still active.
    fn is_active(&self) -> bool;
}

/// Provider for transaction support.
#[async_trait]
pub trait TransactionProvider: EmployeeStorage {
    /// The transaction type returned by this provider.
    type Transaction: EmployeeTransaction;

    /// Begins a new serializable write transaction.
    ///
    /// # Errors
    ///
    /// * `StorageError::Concurrency(SerializationFailure)` - If the write lock cannot be taken
    /// * `StorageError::Backend` - If connection cannot be acquired
    async fn begin_transaction(&self) -> StorageResult<Self::Transaction>;
}
