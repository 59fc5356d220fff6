//! Filter expressions for document search.
//!
//! A [`FilterEmployee`] maps a comparison operator to the fields compared with
//! it, each with a list of raw values. The wire form is
//!
//! ```json
//! {"filterMap": {"EQUAL": {"department": ["A", "B"]}, "GREATER": {"age": ["30"]}}}
//! ```
//!
//! Operator and field names are parsed strictly: an unknown tag is an error,
//! never silently skipped.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::search::converters::DocumentField;

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterOperator {
    /// Field value is one of the given values.
    Equal,
    /// Field value is strictly greater than the first value.
    Greater,
    /// Field value is strictly less than the first value.
    Less,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equal => "EQUAL",
            FilterOperator::Greater => "GREATER",
            FilterOperator::Less => "LESS",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EQUAL" => Ok(FilterOperator::Equal),
            "GREATER" => Ok(FilterOperator::Greater),
            "LESS" => Ok(FilterOperator::Less),
            _ => Err(SearchError::UnsupportedOperator {
                operator: s.to_string(),
            }),
        }
    }
}

/// A structured filter: operator → field → raw values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFilterEmployee", into = "RawFilterEmployee")]
pub struct FilterEmployee {
    filter_map: BTreeMap<FilterOperator, BTreeMap<DocumentField, Vec<String>>>,
}

impl FilterEmployee {
    /// An empty filter, matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a comparison. Values for the same operator and field accumulate.
    pub fn with<I, V>(mut self, operator: FilterOperator, field: DocumentField, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.filter_map
            .entry(operator)
            .or_default()
            .entry(field)
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn equal<I, V>(self, field: DocumentField, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.with(FilterOperator::Equal, field, values)
    }

    pub fn greater(self, field: DocumentField, value: impl Into<String>) -> Self {
        self.with(FilterOperator::Greater, field, [value.into()])
    }

    pub fn less(self, field: DocumentField, value: impl Into<String>) -> Self {
        self.with(FilterOperator::Less, field, [value.into()])
    }

    pub fn filter_map(&self) -> &BTreeMap<FilterOperator, BTreeMap<DocumentField, Vec<String>>> {
        &self.filter_map
    }

    pub fn is_empty(&self) -> bool {
        self.filter_map.values().all(|fields| fields.is_empty())
    }

    /// Iterates `(operator, field, values)` triples in a stable order.
    pub fn triples(&self) -> impl Iterator<Item = (FilterOperator, DocumentField, &[String])> {
        self.filter_map.iter().flat_map(|(op, fields)| {
            fields
                .iter()
                .map(move |(field, values)| (*op, *field, values.as_slice()))
        })
    }
}

/// Wire form of [`FilterEmployee`] with unparsed operator and field names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFilterEmployee {
    #[serde(default)]
    pub filter_map: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl TryFrom<RawFilterEmployee> for FilterEmployee {
    type Error = SearchError;

    fn try_from(raw: RawFilterEmployee) -> Result<Self, Self::Error> {
        let mut filter = FilterEmployee::new();
        for (operator, fields) in raw.filter_map {
            let operator: FilterOperator = operator.parse()?;
            for (field, values) in fields {
                let field: DocumentField = field.parse()?;
                filter = filter.with(operator, field, values);
            }
        }
        Ok(filter)
    }
}

impl From<FilterEmployee> for RawFilterEmployee {
    fn from(filter: FilterEmployee) -> Self {
        let filter_map = filter
            .filter_map
            .into_iter()
            .map(|(op, fields)| {
                let fields = fields
                    .into_iter()
                    .map(|(field, values)| (field.field_name().to_string(), values))
                    .collect();
                (op.as_str().to_string(), fields)
            })
            .collect();
        Self { filter_map }
    }
}
