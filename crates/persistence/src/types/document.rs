//! Search index documents.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::employee::Employee;

/// The search-index projection of an [`Employee`].
///
/// Documents are keyed by the record identity but are indexed explicitly,
/// not on every write, so a document may lag behind its record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeDocument {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub salary: Option<f64>,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
}

impl EmployeeDocument {
    /// The index key for this document.
    pub fn document_id(&self) -> String {
        self.id.to_string()
    }
}

impl From<&Employee> for EmployeeDocument {
    fn from(employee: &Employee) -> Self {
        let fields = &employee.fields;
        Self {
            id: employee.id,
            username: employee.username.clone(),
            first_name: fields.first_name.clone(),
            last_name: fields.last_name.clone(),
            email: fields.email.clone(),
            phone_number: Some(employee.phone_number.clone()),
            department: fields.department.clone(),
            position: fields.position.clone(),
            age: fields.age,
            salary: fields.salary,
            hire_date: fields.hire_date,
        }
    }
}
