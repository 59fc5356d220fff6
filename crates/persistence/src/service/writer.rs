//! Record Writer.
//!
//! Conflict-checked writes against the system of record. Each operation
//! runs in one serializable transaction; the existence and uniqueness
//! checks see exactly the state the write commits against.
//!
//! Every successful write yields one [`ChangeEnvelope`] per mutated record.
//! With [`ChangeDelivery::Outbox`] the envelope is written to the outbox in
//! the same transaction; with [`ChangeDelivery::Direct`] it is handed to the
//! [`ChangePublisher`] after commit and a delivery failure never affects
//! the committed write.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::{EmployeeTransaction, TransactionProvider};
use crate::error::{ResourceError, StorageResult, ValidationError};
use crate::messaging::{ChangePublisher, DeliveryMode, MessageSink, MessagingConfig};
use crate::types::{
    BulkEmployeeUpdate, ChangeEnvelope, Employee, EmployeeDto, NewEmployee, OperationType,
};

/// How envelopes produced by the writer are delivered.
#[derive(Debug, Clone)]
pub enum ChangeDelivery {
    /// Persist envelopes in the outbox inside the write transaction.
    Outbox { topic: String },
    /// Publish envelopes after commit, fire-and-forget.
    Direct(Arc<ChangePublisher>),
}

impl ChangeDelivery {
    /// Builds the delivery configured in `config`. Direct mode spawns the
    /// publisher worker, so this must run inside a tokio runtime.
    pub fn from_config(config: &MessagingConfig, sink: Arc<dyn MessageSink>) -> Self {
        match config.delivery {
            DeliveryMode::Outbox => ChangeDelivery::Outbox {
                topic: config.topic.clone(),
            },
            DeliveryMode::Direct => {
                ChangeDelivery::Direct(Arc::new(ChangePublisher::start(sink, config)))
            }
        }
    }

    pub fn mode(&self) -> DeliveryMode {
        match self {
            ChangeDelivery::Outbox { .. } => DeliveryMode::Outbox,
            ChangeDelivery::Direct(_) => DeliveryMode::Direct,
        }
    }
}

/// Performs create, update and bulk update against the system of record.
pub struct RecordWriter<S> {
    storage: Arc<S>,
    delivery: ChangeDelivery,
    max_attempts: u32,
}

impl<S> std::fmt::Debug for RecordWriter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordWriter")
            .field("delivery", &self.delivery.mode())
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl<S: TransactionProvider> RecordWriter<S> {
    /// Creates a writer. `transaction_retries` is how many times an
    /// operation aborted by a serialization failure is re-run.
    pub fn new(storage: Arc<S>, delivery: ChangeDelivery, transaction_retries: u32) -> Self {
        Self {
            storage,
            delivery,
            max_attempts: transaction_retries.saturating_add(1),
        }
    }

    pub fn delivery(&self) -> &ChangeDelivery {
        &self.delivery
    }

    /// Creates an employee.
    ///
    /// # Errors
    ///
    /// * `ValidationError::MissingRequiredField` - username or phone number absent
    /// * `ResourceError::AlreadyExists` - phone number or username already taken
    /// * `ConcurrencyError::SerializationFailure` - still contended after all retries
    pub async fn create(&self, dto: EmployeeDto) -> StorageResult<Employee> {
        let new = NewEmployee::try_from(dto)?;
        let this = self;
        let new = &new;
        let employee = self
            .with_retry("create", move || this.try_create(new))
            .await?;

        info!(
            id = employee.id,
            username = %employee.username,
            "Created employee"
        );
        Ok(employee)
    }

    /// Overwrites the mutable fields of the employee addressed by `dto.id`.
    ///
    /// `username` and `id` are always restored from the stored record. The
    /// phone number is kept when `dto` omits it; it is not re-checked for
    /// uniqueness.
    ///
    /// # Errors
    ///
    /// * `ValidationError::MissingRequiredField` - `dto.id` absent
    /// * `ResourceError::NotFound` - no employee with that id
    /// * `ValidationError::ImmutableField` - `dto.username` present and different
    pub async fn update_by_identity(&self, dto: EmployeeDto) -> StorageResult<Employee> {
        let id = dto.id.ok_or_else(|| ValidationError::MissingRequiredField {
            field: "id".to_string(),
        })?;
        let this = self;
        let dto = &dto;
        let employee = self
            .with_retry("update", move || this.try_update(id, dto))
            .await?;

        info!(id = employee.id, version = employee.version, "Updated employee");
        Ok(employee)
    }

    /// Applies every accepted-field directive to every listed employee.
    ///
    /// The batch is all-or-nothing: the first missing id or unparseable
    /// value rolls back every change. No uniqueness re-check is performed,
    /// so a `PHONE_NUMBER` directive can produce duplicate phone numbers.
    ///
    /// # Errors
    ///
    /// * `ValidationError::DuplicateIds` - an id is listed twice; nothing is read or written
    /// * `ResourceError::NotFound` - an id does not exist
    /// * `ValidationError::InvalidFieldValue` - a directive value cannot be parsed
    pub async fn bulk_apply_fields(
        &self,
        update: &BulkEmployeeUpdate,
    ) -> StorageResult<Vec<Employee>> {
        let duplicates = update.duplicate_ids();
        if !duplicates.is_empty() {
            return Err(ValidationError::DuplicateIds { ids: duplicates }.into());
        }
        if update.employee_ids.is_empty() {
            return Ok(Vec::new());
        }

        let this = self;
        let employees = self
            .with_retry("bulk_update", move || this.try_bulk_apply(update))
            .await?;

        info!(
            count = employees.len(),
            fields = update.fields.len(),
            "Bulk updated employees"
        );
        Ok(employees)
    }

    async fn try_create(&self, new: &NewEmployee) -> StorageResult<Employee> {
        let mut tx = self.storage.begin_transaction().await?;

        if tx.find_by_phone_number(&new.phone_number).await?.is_some() {
            return Err(ResourceError::employee_exists("phone_number", &new.phone_number).into());
        }
        if tx.find_by_username(&new.username).await?.is_some() {
            return Err(ResourceError::employee_exists("username", &new.username).into());
        }

        let employee = tx.insert(new).await?;
        let envelopes = vec![ChangeEnvelope::employee(OperationType::Create, &employee)];
        self.commit(tx, envelopes).await?;
        Ok(employee)
    }

    async fn try_update(&self, id: i64, dto: &EmployeeDto) -> StorageResult<Employee> {
        let mut tx = self.storage.begin_transaction().await?;

        let stored = tx
            .find_by_id(id)
            .await?
            .ok_or_else(|| ResourceError::employee_not_found("id", id))?;

        if let Some(username) = &dto.username {
            if *username != stored.username {
                return Err(ValidationError::ImmutableField {
                    field: "username".to_string(),
                }
                .into());
            }
        }

        let proposed = Employee {
            phone_number: dto
                .phone_number
                .clone()
                .unwrap_or_else(|| stored.phone_number.clone()),
            fields: dto.fields.clone(),
            ..stored
        };

        let employee = tx.update(&proposed).await?;
        let envelopes = vec![ChangeEnvelope::employee(OperationType::Update, &employee)];
        self.commit(tx, envelopes).await?;
        Ok(employee)
    }

    async fn try_bulk_apply(&self, update: &BulkEmployeeUpdate) -> StorageResult<Vec<Employee>> {
        let mut tx = self.storage.begin_transaction().await?;
        let mut employees = Vec::with_capacity(update.employee_ids.len());

        for &id in &update.employee_ids {
            let mut employee = tx
                .find_by_id(id)
                .await?
                .ok_or_else(|| ResourceError::employee_not_found("id", id))?;

            for (field, value) in &update.fields {
                field.apply(&mut employee, value)?;
            }

            employees.push(tx.update(&employee).await?);
        }

        let envelopes = employees
            .iter()
            .map(|e| ChangeEnvelope::employee(OperationType::Update, e))
            .collect();
        self.commit(tx, envelopes).await?;
        Ok(employees)
    }

    /// Stages envelopes, commits, then dispatches them in direct mode.
    async fn commit(
        &self,
        mut tx: S::Transaction,
        envelopes: Vec<ChangeEnvelope>,
    ) -> StorageResult<()> {
        if let ChangeDelivery::Outbox { topic } = &self.delivery {
            for envelope in &envelopes {
                tx.enqueue_change(topic, envelope).await?;
            }
        }

        Box::new(tx).commit().await?;

        if let ChangeDelivery::Direct(publisher) = &self.delivery {
            for envelope in envelopes {
                publisher.publish(envelope);
            }
        }
        Ok(())
    }

    /// Re-runs `op` while it fails with a retriable error.
    async fn with_retry<F, Fut, T>(&self, operation: &str, op: F) -> StorageResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = StorageResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Err(e) if e.is_retriable() && attempt < self.max_attempts => {
                    warn!(
                        operation = operation,
                        attempt = attempt,
                        error = %e,
                        "Transaction aborted, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(10 * u64::from(attempt))).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!(operation = operation, error = %e, "Write failed");
                    return Err(e);
                }
                Ok(value) => return Ok(value),
            }
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::backends::sqlite::SqliteBackend;
    use crate::core::EmployeeStorage;
    use crate::error::{ErrorCategory, StorageError};
    use crate::types::{AcceptedField, EmployeeFields};

    fn writer() -> (Arc<SqliteBackend>, RecordWriter<SqliteBackend>) {
        let backend = Arc::new(SqliteBackend::in_memory().unwrap());
        backend.init_schema().unwrap();
        let writer = RecordWriter::new(
            backend.clone(),
            ChangeDelivery::Outbox {
                topic: "employee".to_string(),
            },
            3,
        );
        (backend, writer)
    }

    #[tokio::test]
    async fn test_create_then_conflict_on_phone() {
        let (_backend, writer) = writer();
        let first = writer.create(EmployeeDto::new("jdoe", "555-0100")).await.unwrap();
        assert_eq!(first.version, 1);

        let err = writer
            .create(EmployeeDto::new("asmith", "555-0100"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }

    #[tokio::test]
    async fn test_create_conflict_on_username() {
        let (_backend, writer) = writer();
        writer.create(EmployeeDto::new("jdoe", "555-0100")).await.unwrap();
        let err = writer
            .create(EmployeeDto::new("jdoe", "555-0101"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }

    #[tokio::test]
    async fn test_update_restores_identity() {
        let (backend, writer) = writer();
        let created = writer.create(EmployeeDto::new("jdoe", "555-0100")).await.unwrap();

        let dto = EmployeeDto {
            id: Some(created.id),
            username: None,
            phone_number: None,
            fields: EmployeeFields {
                department: Some("Sales".to_string()),
                ..Default::default()
            },
        };
        let updated = writer.update_by_identity(dto).await.unwrap();
        assert_eq!(updated.username, "jdoe");
        assert_eq!(updated.phone_number, "555-0100");
        assert_eq!(updated.version, 2);

        let stored = backend.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.fields.department.as_deref(), Some("Sales"));
    }

    #[tokio::test]
    async fn test_update_username_change_rejected() {
        let (_backend, writer) = writer();
        let created = writer.create(EmployeeDto::new("jdoe", "555-0100")).await.unwrap();

        let dto = EmployeeDto::new("changed", "555-0100").with_id(created.id);
        let err = writer.update_by_identity(dto).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Validation(ValidationError::ImmutableField { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_without_id_is_bad_request() {
        let (_backend, writer) = writer();
        let err = writer
            .update_by_identity(EmployeeDto::new("jdoe", "555-0100"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::BadRequest);
    }

    #[tokio::test]
    async fn test_bulk_rolls_back_on_missing_id() {
        let (backend, writer) = writer();
        let a = writer.create(EmployeeDto::new("a", "1")).await.unwrap();

        let update = BulkEmployeeUpdate::new(vec![a.id, 999])
            .with_field(AcceptedField::Department, "Ops");
        let err = writer.bulk_apply_fields(&update).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NotFound);

        let stored = backend.find_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert!(stored.fields.department.is_none());
    }

    #[tokio::test]
    async fn test_bulk_empty_ids() {
        let (_backend, writer) = writer();
        let update = BulkEmployeeUpdate::new(vec![]).with_field(AcceptedField::Age, "30");
        assert!(writer.bulk_apply_fields(&update).await.unwrap().is_empty());
    }
}
