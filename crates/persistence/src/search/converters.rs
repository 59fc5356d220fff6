//! Value converters for the search index.
//!
//! Maps each searchable document field to the index's native value type and
//! to the comparisons the field supports. The filter compiler delegates all
//! raw-value handling to [`DocumentField::convert`].

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde_json::{Value, json};

use crate::error::{SearchError, SearchResult};
use crate::types::FilterOperator;

/// The index-native type of a document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Exact-match string (`keyword` mapping).
    Keyword,
    /// Whole number (`integer`/`long` mapping).
    Integer,
    /// Floating point number (`double` mapping).
    Float,
    /// Calendar date, `yyyy-MM-dd` (`date` mapping).
    Date,
}

impl FieldKind {
    /// Elasticsearch mapping type for this kind.
    pub fn mapping_type(&self) -> &'static str {
        match self {
            FieldKind::Keyword => "keyword",
            FieldKind::Integer => "long",
            FieldKind::Float => "double",
            FieldKind::Date => "date",
        }
    }

    /// Whether values of this kind are ordered.
    pub fn is_ordered(&self) -> bool {
        !matches!(self, FieldKind::Keyword)
    }
}

/// A searchable field of [`EmployeeDocument`](crate::types::EmployeeDocument).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocumentField {
    Id,
    Username,
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

impl DocumentField {
    /// All searchable fields.
    pub const ALL: [DocumentField; 11] = [
        DocumentField::Id,
        DocumentField::Username,
        DocumentField::FirstName,
        DocumentField::LastName,
        DocumentField::Email,
        DocumentField::PhoneNumber,
        DocumentField::Department,
        DocumentField::Position,
        DocumentField::Age,
        DocumentField::Salary,
        DocumentField::HireDate,
    ];

    /// The key of this field in the indexed document.
    pub fn field_name(&self) -> &'static str {
        match self {
            DocumentField::Id => "id",
            DocumentField::Username => "username",
            DocumentField::FirstName => "first_name",
            DocumentField::LastName => "last_name",
            DocumentField::Email => "email",
            DocumentField::PhoneNumber => "phone_number",
            DocumentField::Department => "department",
            DocumentField::Position => "position",
            DocumentField::Age => "age",
            DocumentField::Salary => "salary",
            DocumentField::HireDate => "hire_date",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            DocumentField::Id | DocumentField::Age => FieldKind::Integer,
            DocumentField::Salary => FieldKind::Float,
            DocumentField::HireDate => FieldKind::Date,
            _ => FieldKind::Keyword,
        }
    }

    /// Whether this field can be compared with `operator`.
    pub fn supports(&self, operator: FilterOperator) -> bool {
        match operator {
            FilterOperator::Equal => true,
            FilterOperator::Greater | FilterOperator::Less => self.kind().is_ordered(),
        }
    }

    /// Converts raw filter values into index-native values.
    pub fn convert(&self, raw: &[String]) -> SearchResult<Vec<Value>> {
        raw.iter().map(|v| self.convert_one(v)).collect()
    }

    fn convert_one(&self, raw: &str) -> SearchResult<Value> {
        let trimmed = raw.trim();
        match self.kind() {
            FieldKind::Keyword => Ok(Value::String(raw.to_string())),
            FieldKind::Integer => trimmed
                .parse::<i64>()
                .map(|n| json!(n))
                .map_err(|e| self.invalid(raw, e)),
            FieldKind::Float => {
                let n = trimmed.parse::<f64>().map_err(|e| self.invalid(raw, e))?;
                if !n.is_finite() {
                    return Err(self.invalid(raw, "not a finite number"));
                }
                Ok(json!(n))
            }
            FieldKind::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .map_err(|e| self.invalid(raw, e)),
        }
    }

    fn invalid(&self, raw: &str, cause: impl fmt::Display) -> SearchError {
        SearchError::InvalidValue {
            field: self.field_name().to_string(),
            value: raw.to_string(),
            message: cause.to_string(),
        }
    }
}

impl fmt::Display for DocumentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

impl FromStr for DocumentField {
    type Err = SearchError;

    /// Accepts the document key (`hire_date`) or its camel form (`hireDate`,
    /// `HireDate`), ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s.chars().filter(|c| *c != '_').collect();
        DocumentField::ALL
            .into_iter()
            .find(|f| {
                let name: String = f.field_name().chars().filter(|c| *c != '_').collect();
                name.eq_ignore_ascii_case(&key)
            })
            .ok_or_else(|| SearchError::UnknownField {
                field: s.to_string(),
            })
    }
}
