//! Read access to the system of record.
//!
//! This module defines the [`EmployeeStorage`] trait, the non-transactional
//! read surface of a record store. Writes always go through a
//! [`EmployeeTransaction`](super::EmployeeTransaction).

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::Employee;

/// Read operations on stored employees.
///
/// Every read observes only committed state. Lookups that find nothing
/// return `Ok(None)`; turning a miss into `NotFound` is the caller's job.
///
/// # Example
///
/// ```ignore
/// use workhub_persistence::core::EmployeeStorage;
///
/// async fn show<S: EmployeeStorage>(storage: &S) -> StorageResult<()> {
///     if let Some(e) = storage.find_by_username("jdoe").await? {
///         println!("{} v{}", e.id, e.version);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait EmployeeStorage: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Reads an employee by identity.
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Employee>>;

    /// Reads an employee by username.
    async fn find_by_username(&self, username: &str) -> StorageResult<Option<Employee>>;

    /// Reads an employee by phone number.
    ///
    /// Phone numbers are unique at insert time only, so this returns the
    /// lowest-id match when an update has introduced a duplicate.
    async fn find_by_phone_number(&self, phone_number: &str) -> StorageResult<Option<Employee>>;

    /// Lists employees in identity order.
    async fn list(&self, offset: u64, limit: u32) -> StorageResult<Vec<Employee>>;

    /// Counts stored employees.
    async fn count(&self) -> StorageResult<u64>;
}
