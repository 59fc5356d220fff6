//! Employee record types.
//!
//! This module defines the canonical [`Employee`] record held by the system of
//! record, the [`EmployeeDto`] write request, and the validated [`NewEmployee`]
//! insert payload.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The mutable attributes of an employee.
///
/// Everything here may be overwritten by an update; identity, username and
/// phone number live on [`Employee`] itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeFields {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
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

/// An employee as stored in the system of record.
///
/// `id` and `username` never change after creation. `phone_number` is unique
/// among all records at insert time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Store-assigned identity.
    pub id: i64,

    /// Unique login name.
    pub username: String,

    /// Phone number, unique at insert time.
    pub phone_number: String,

    /// Mutable attributes.
    #[serde(flatten)]
    pub fields: EmployeeFields,

    /// Incremented on every persisted change.
    pub version: u64,

    /// When the record was first persisted.
    pub created_at: DateTime<Utc>,

    /// When the record was last persisted.
    pub updated_at: DateTime<Utc>,
}

/// A write request for an employee.
///
/// Create requires `username` and `phone_number`. Update addresses the record
/// by `id`; a present `username` (or `id`) that differs from the stored value
/// is rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDto {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, alias = "userName")]
    pub username: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(flatten)]
    pub fields: EmployeeFields,
}

impl EmployeeDto {
    /// Creates a request with the two fields required for creation.
    pub fn new(username: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            phone_number: Some(phone_number.into()),
            ..Default::default()
        }
    }

    /// Sets the identity.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the mutable attributes.
    pub fn with_fields(mut self, fields: EmployeeFields) -> Self {
        self.fields = fields;
        self
    }
}

impl From<&Employee> for EmployeeDto {
    fn from(employee: &Employee) -> Self {
        Self {
            id: Some(employee.id),
            username: Some(employee.username.clone()),
            phone_number: Some(employee.phone_number.clone()),
            fields: employee.fields.clone(),
        }
    }
}

/// A validated insert payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmployee {
    pub username: String,
    pub phone_number: String,
    pub fields: EmployeeFields,
}

impl TryFrom<EmployeeDto> for NewEmployee {
    type Error = ValidationError;

    fn try_from(dto: EmployeeDto) -> Result<Self, Self::Error> {
        let username = required("username", dto.username)?;
        let phone_number = required("phoneNumber", dto.phone_number)?;
        Ok(Self {
            username,
            phone_number,
            fields: dto.fields,
        })
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::MissingRequiredField {
            field: field.to_string(),
        }),
    }
}
