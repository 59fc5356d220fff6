//! Query DSL builder.
//!
//! Translates a [`FilterEmployee`] into an Elasticsearch Query DSL body.
//!
//! - `EQUAL` emits a `terms` clause under `bool.must`.
//! - `GREATER` and `LESS` emit a `range` clause (`gt`/`lt`) under `bool.filter`
//!   comparing against the first value only.
//!
//! All clauses are conjunctive. A builder is created for a single filter and
//! consumed by [`EmployeeQueryBuilder::build`]; the resulting [`CompiledQuery`]
//! is immutable, so concurrent searches never share query state.

use serde_json::{Map, Value, json};

use crate::error::{SearchError, SearchResult};
use crate::types::{FilterEmployee, FilterOperator};

use super::converters::DocumentField;

/// Default number of hits requested per search.
pub const DEFAULT_MAX_RESULTS: u32 = 10_000;

/// A compiled, backend-ready query.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    body: Value,
}

impl CompiledQuery {
    /// The complete request body.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// The boolean query part of the body.
    pub fn query(&self) -> &Value {
        &self.body["query"]
    }

    /// Requested hit count.
    pub fn size(&self) -> Option<u64> {
        self.body.get("size").and_then(Value::as_u64)
    }

    pub fn into_body(self) -> Value {
        self.body
    }
}

/// Builds a [`CompiledQuery`] from a filter expression.
#[derive(Debug)]
pub struct EmployeeQueryBuilder<'a> {
    filter: &'a FilterEmployee,
    max_results: u32,
}

impl<'a> EmployeeQueryBuilder<'a> {
    /// Creates a builder for `filter`.
    pub fn new(filter: &'a FilterEmployee) -> Self {
        Self {
            filter,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Sets the number of hits to request.
    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    /// Compiles the filter.
    pub fn build(self) -> SearchResult<CompiledQuery> {
        let mut must: Vec<Value> = Vec::new();
        let mut filter: Vec<Value> = Vec::new();

        for (operator, field, values) in self.filter.triples() {
            if !field.supports(operator) {
                return Err(SearchError::UnsupportedComparison {
                    field: field.field_name().to_string(),
                    operator: operator.to_string(),
                });
            }

            match operator {
                FilterOperator::Equal => must.push(terms_clause(field, values)?),
                FilterOperator::Greater => {
                    filter.push(range_clause(field, operator, "gt", values)?)
                }
                FilterOperator::Less => filter.push(range_clause(field, operator, "lt", values)?),
            }
        }

        let query = if must.is_empty() && filter.is_empty() {
            json!({ "match_all": {} })
        } else {
            let mut bool_query = Map::new();
            if !must.is_empty() {
                bool_query.insert("must".to_string(), Value::Array(must));
            }
            if !filter.is_empty() {
                bool_query.insert("filter".to_string(), Value::Array(filter));
            }
            json!({ "bool": bool_query })
        };

        Ok(CompiledQuery {
            body: json!({
                "query": query,
                "size": self.max_results,
            }),
        })
    }
}

/// Compiles `filter` with the default hit count.
pub fn compile(filter: &FilterEmployee) -> SearchResult<CompiledQuery> {
    EmployeeQueryBuilder::new(filter).build()
}

fn terms_clause(field: DocumentField, values: &[String]) -> SearchResult<Value> {
    let converted = field.convert(values)?;
    Ok(json!({ "terms": { field.field_name(): converted } }))
}

fn range_clause(
    field: DocumentField,
    operator: FilterOperator,
    bound: &str,
    values: &[String],
) -> SearchResult<Value> {
    let first = values.first().ok_or_else(|| SearchError::MissingValue {
        field: field.field_name().to_string(),
        operator: operator.to_string(),
    })?;
    let converted = field.convert(std::slice::from_ref(first))?;
    Ok(json!({ "range": { field.field_name(): { bound: converted[0] } } }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_all() {
        let query = compile(&FilterEmployee::new()).unwrap();
        assert_eq!(query.query(), &json!({ "match_all": {} }));
        assert_eq!(query.size(), Some(u64::from(DEFAULT_MAX_RESULTS)));
    }

    #[test]
    fn test_equal_and_greater() {
        let filter = FilterEmployee::new()
            .equal(DocumentField::Department, ["A", "B"])
            .greater(DocumentField::Age, "30");
        let query = compile(&filter).unwrap();

        assert_eq!(
            query.query(),
            &json!({
                "bool": {
                    "must": [{ "terms": { "department": ["A", "B"] } }],
                    "filter": [{ "range": { "age": { "gt": 30 } } }]
                }
            })
        );
    }

    #[test]
    fn test_less_uses_first_value_only() {
        let filter = FilterEmployee::new().with(
            FilterOperator::Less,
            DocumentField::Salary,
            ["50000", "1"],
        );
        let query = compile(&filter).unwrap();
        assert_eq!(
            query.query()["bool"]["filter"],
            json!([{ "range": { "salary": { "lt": 50000.0 } } }])
        );
    }

    #[test]
    fn test_range_without_value_fails() {
        let filter = FilterEmployee::new().with(
            FilterOperator::Greater,
            DocumentField::Age,
            Vec::<String>::new(),
        );
        let err = compile(&filter).unwrap_err();
        assert_eq!(
            err,
            SearchError::MissingValue {
                field: "age".to_string(),
                operator: "GREATER".to_string()
            }
        );
    }

    #[test]
    fn test_range_on_keyword_fails() {
        let filter = FilterEmployee::new().greater(DocumentField::Department, "M");
        assert!(matches!(
            compile(&filter),
            Err(SearchError::UnsupportedComparison { .. })
        ));
    }

    #[test]
    fn test_invalid_value_fails() {
        let filter = FilterEmployee::new().less(DocumentField::HireDate, "yesterday");
        assert!(matches!(
            compile(&filter),
            Err(SearchError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_builders_are_independent() {
        let a = FilterEmployee::new().equal(DocumentField::Department, ["A"]);
        let b = FilterEmployee::new().less(DocumentField::Age, "20");

        let qa = EmployeeQueryBuilder::new(&a).max_results(5).build().unwrap();
        let qb = EmployeeQueryBuilder::new(&b).build().unwrap();

        assert!(qa.query()["bool"].get("filter").is_none());
        assert!(qb.query()["bool"].get("must").is_none());
        assert_eq!(qa.size(), Some(5));
    }
}
