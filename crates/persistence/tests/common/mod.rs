//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use workhub_persistence::backends::memory::InMemorySearchIndex;
use workhub_persistence::backends::sqlite::{SqliteBackend, SqliteBackendConfig};
use workhub_persistence::messaging::{ChangePublisher, MessagingConfig, RecordingSink};
use workhub_persistence::types::{EmployeeDocument, EmployeeDto, EmployeeFields};
use workhub_persistence::{ChangeDelivery, EmployeeService, ServiceConfig};

pub const TOPIC: &str = "employee";

/// An in-memory system of record with the schema applied.
pub fn memory_backend() -> Arc<SqliteBackend> {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to initialize schema");
    Arc::new(backend)
}

/// A file-backed system of record, so that concurrent writers use separate
/// connections.
pub fn file_backend(dir: &Path) -> Arc<SqliteBackend> {
    let backend = SqliteBackend::with_config(dir.join("workhub.db"), SqliteBackendConfig::default())
        .expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to initialize schema");
    Arc::new(backend)
}

pub fn outbox_delivery() -> ChangeDelivery {
    ChangeDelivery::Outbox {
        topic: TOPIC.to_string(),
    }
}

/// Direct delivery into `sink`.
pub fn direct_delivery(sink: Arc<RecordingSink>) -> ChangeDelivery {
    let config = MessagingConfig::default();
    ChangeDelivery::Direct(Arc::new(ChangePublisher::start(sink, &config)))
}

pub struct TestService {
    pub backend: Arc<SqliteBackend>,
    pub index: Arc<InMemorySearchIndex>,
    pub service: EmployeeService<SqliteBackend>,
}

pub fn service_with(backend: Arc<SqliteBackend>, delivery: ChangeDelivery) -> TestService {
    let index = Arc::new(InMemorySearchIndex::new());
    let service = EmployeeService::new(
        backend.clone(),
        index.clone(),
        delivery,
        &ServiceConfig::default(),
    );
    TestService {
        backend,
        index,
        service,
    }
}

pub fn memory_service() -> TestService {
    service_with(memory_backend(), outbox_delivery())
}

pub fn employee(username: &str, phone: &str) -> EmployeeDto {
    EmployeeDto::new(username, phone)
}

pub fn employee_in(username: &str, phone: &str, department: &str, age: u32) -> EmployeeDto {
    EmployeeDto::new(username, phone).with_fields(EmployeeFields {
        department: Some(department.to_string()),
        age: Some(age),
        ..Default::default()
    })
}

pub fn document(id: i64, username: &str, department: &str, age: u32) -> EmployeeDocument {
    EmployeeDocument {
        id,
        username: username.to_string(),
        first_name: Some("Test".to_string()),
        last_name: Some(username.to_uppercase()),
        email: Some(format!("{}@example.com", username)),
        phone_number: Some(format!("555-{:04}", id)),
        department: Some(department.to_string()),
        position: Some("Engineer".to_string()),
        age: Some(age),
        salary: Some(1000.5 * id as f64),
        hire_date: chrono::NaiveDate::from_ymd_opt(2020, 1, (id as u32 % 28) + 1),
    }
}
