//! Whitelisted field directives for bulk partial updates.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::employee::Employee;

/// A field that may be set through a bulk update.
///
/// Each directive owns the parsing of its raw string value and the
/// assignment onto the target record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcceptedField {
    FirstName,
    LastName,
    Email,
    PhoneNumber,
    Department,
    Position,
    Age,
    Salary,
    HireDate,
}

impl AcceptedField {
    /// All accepted fields.
    pub const ALL: [AcceptedField; 9] = [
        AcceptedField::FirstName,
        AcceptedField::LastName,
        AcceptedField::Email,
        AcceptedField::PhoneNumber,
        AcceptedField::Department,
        AcceptedField::Position,
        AcceptedField::Age,
        AcceptedField::Salary,
        AcceptedField::HireDate,
    ];

    /// The wire name of this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            AcceptedField::FirstName => "FIRST_NAME",
            AcceptedField::LastName => "LAST_NAME",
            AcceptedField::Email => "EMAIL",
            AcceptedField::PhoneNumber => "PHONE_NUMBER",
            AcceptedField::Department => "DEPARTMENT",
            AcceptedField::Position => "POSITION",
            AcceptedField::Age => "AGE",
            AcceptedField::Salary => "SALARY",
            AcceptedField::HireDate => "HIRE_DATE",
        }
    }

    /// Parses `value` and assigns it to `employee`.
    ///
    /// On error the employee is left untouched.
    pub fn apply(&self, employee: &mut Employee, value: &str) -> Result<(), ValidationError> {
        let fields = &mut employee.fields;
        match self {
            AcceptedField::FirstName => fields.first_name = Some(self.text(value)?),
            AcceptedField::LastName => fields.last_name = Some(self.text(value)?),
            AcceptedField::Email => {
                let email = self.text(value)?;
                if !email.contains('@') {
                    return Err(self.invalid(value, "expected an email address"));
                }
                fields.email = Some(email);
            }
            AcceptedField::PhoneNumber => employee.phone_number = self.text(value)?,
            AcceptedField::Department => fields.department = Some(self.text(value)?),
            AcceptedField::Position => fields.position = Some(self.text(value)?),
            AcceptedField::Age => {
                let age = value
                    .trim()
                    .parse::<u32>()
                    .map_err(|e| self.invalid(value, &e.to_string()))?;
                fields.age = Some(age);
            }
            AcceptedField::Salary => {
                let salary = value
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| self.invalid(value, &e.to_string()))?;
                if !salary.is_finite() || salary < 0.0 {
                    return Err(self.invalid(value, "expected a non-negative amount"));
                }
                fields.salary = Some(salary);
            }
            AcceptedField::HireDate => {
                let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                    .map_err(|e| self.invalid(value, &e.to_string()))?;
                fields.hire_date = Some(date);
            }
        }
        Ok(())
    }

    fn text(&self, value: &str) -> Result<String, ValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(self.invalid(value, "value must not be empty"));
        }
        Ok(trimmed.to_string())
    }

    fn invalid(&self, value: &str, message: &str) -> ValidationError {
        ValidationError::InvalidFieldValue {
            field: self.as_str().to_string(),
            value: value.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for AcceptedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AcceptedField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AcceptedField::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnacceptedField {
                field: s.to_string(),
            })
    }
}

/// A bulk partial update: apply every directive to every listed employee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEmployeeUpdate {
    pub employee_ids: Vec<i64>,
    #[serde(alias = "acceptedFieldsMap")]
    pub fields: BTreeMap<AcceptedField, String>,
}

impl BulkEmployeeUpdate {
    pub fn new(employee_ids: Vec<i64>) -> Self {
        Self {
            employee_ids,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, field: AcceptedField, value: impl Into<String>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    /// Returns the ids that appear more than once, in first-seen order.
    pub fn duplicate_ids(&self) -> Vec<i64> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        for id in &self.employee_ids {
            if !seen.insert(*id) && !duplicates.contains(id) {
                duplicates.push(*id);
            }
        }
        duplicates
    }
}
