//! Process-local [`SearchIndex`].
//!
//! Evaluates the subset of the Query DSL the filter compiler emits:
//! `match_all`, `bool` (`must`, `filter`, `should`, `must_not`), `terms`,
//! `term` and `range` (`gt`, `gte`, `lt`, `lte`). Anything else is rejected,
//! the way a real cluster would reject a malformed query.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::core::{Backend, BackendKind, SearchHit, SearchIndex};
use crate::error::{BackendError, IndexError, IndexResult};
use crate::search::CompiledQuery;

/// In-memory document index.
#[derive(Debug, Default)]
pub struct InMemorySearchIndex {
    indices: RwLock<HashMap<String, BTreeMap<String, Value>>>,
    unavailable: AtomicBool,
}

impl InMemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`IndexError::Unavailable`]
    /// (or succeed again when `false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    /// Number of documents in `index`.
    pub fn document_count(&self, index: &str) -> usize {
        self.indices.read().get(index).map_or(0, BTreeMap::len)
    }

    /// Returns the stored source of a document.
    pub fn get(&self, index: &str, id: &str) -> Option<Value> {
        self.indices.read().get(index)?.get(id).cloned()
    }

    fn check_available(&self) -> IndexResult<()> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(IndexError::Unavailable {
                backend_name: "memory".to_string(),
                message: "index marked unavailable".to_string(),
            });
        }
        Ok(())
    }
}

fn rejected(message: impl Into<String>) -> IndexError {
    IndexError::Rejected {
        backend_name: "memory".to_string(),
        message: message.into(),
    }
}

/// Evaluates a query clause against a document source.
fn matches(clause: &Value, doc: &Value) -> IndexResult<bool> {
    let obj = clause
        .as_object()
        .filter(|o| o.len() == 1)
        .ok_or_else(|| rejected(format!("malformed query clause: {}", clause)))?;
    let (kind, body) = obj
        .iter()
        .next()
        .ok_or_else(|| rejected("empty query clause"))?;

    match kind.as_str() {
        "match_all" => Ok(true),
        "bool" => matches_bool(body, doc),
        "terms" => {
            let (field, values) = single_field(body)?;
            let values = values
                .as_array()
                .ok_or_else(|| rejected(format!("terms on {} expects an array", field)))?;
            let actual = &doc[field.as_str()];
            Ok(values.iter().any(|v| json_eq(actual, v)))
        }
        "term" => {
            let (field, value) = single_field(body)?;
            let value = value.get("value").unwrap_or(value);
            Ok(json_eq(&doc[field.as_str()], value))
        }
        "range" => {
            let (field, bounds) = single_field(body)?;
            let bounds = bounds
                .as_object()
                .ok_or_else(|| rejected(format!("range on {} expects bounds", field)))?;
            let actual = &doc[field.as_str()];
            for (op, bound) in bounds {
                let ordering = match json_cmp(actual, bound) {
                    Some(o) => o,
                    None => return Ok(false),
                };
                let ok = match op.as_str() {
                    "gt" => ordering == Ordering::Greater,
                    "gte" => ordering != Ordering::Less,
                    "lt" => ordering == Ordering::Less,
                    "lte" => ordering != Ordering::Greater,
                    other => return Err(rejected(format!("unsupported range bound: {}", other))),
                };
                if !ok {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        other => Err(rejected(format!("unsupported query type: {}", other))),
    }
}

fn matches_bool(body: &Value, doc: &Value) -> IndexResult<bool> {
    let clauses = |name: &str| -> Vec<Value> {
        match body.get(name) {
            Some(Value::Array(items)) => items.clone(),
            Some(single @ Value::Object(_)) => vec![single.clone()],
            _ => Vec::new(),
        }
    };

    for clause in clauses("must").iter().chain(clauses("filter").iter()) {
        if !matches(clause, doc)? {
            return Ok(false);
        }
    }
    for clause in &clauses("must_not") {
        if matches(clause, doc)? {
            return Ok(false);
        }
    }
    let should = clauses("should");
    if !should.is_empty() {
        let mut any = false;
        for clause in &should {
            if matches(clause, doc)? {
                any = true;
                break;
            }
        }
        return Ok(any);
    }
    Ok(true)
}

fn single_field(body: &Value) -> IndexResult<(&String, &Value)> {
    body.as_object()
        .filter(|o| o.len() == 1)
        .and_then(|o| o.iter().next())
        .ok_or_else(|| rejected(format!("expected a single field in {}", body)))
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Null, _) | (_, Value::Null) => false,
        _ => a == b,
    }
}

/// Orders numbers numerically and strings lexically (ISO dates sort
/// chronologically). Mixed or missing values do not compare.
fn json_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn id_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

#[async_trait]
impl SearchIndex for InMemorySearchIndex {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ensure_index(&self, index: &str) -> IndexResult<()> {
        self.check_available()?;
        self.indices.write().entry(index.to_string()).or_default();
        Ok(())
    }

    async fn upsert(&self, index: &str, id: &str, source: &Value) -> IndexResult<String> {
        self.check_available()?;
        if !source.is_object() {
            return Err(IndexError::Serialization {
                message: format!("document {} is not an object", id),
            });
        }
        self.indices
            .write()
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), source.clone());
        Ok(id.to_string())
    }

    async fn search(&self, index: &str, query: &CompiledQuery) -> IndexResult<Vec<SearchHit>> {
        self.check_available()?;

        let size = query.size().map_or(usize::MAX, |s| s as usize);
        let indices = self.indices.read();
        let Some(docs) = indices.get(index) else {
            return Ok(Vec::new());
        };

        let mut hits = Vec::new();
        for (id, source) in docs {
            if matches(query.query(), source)? {
                hits.push(SearchHit {
                    id: id.clone(),
                    source: source.clone(),
                });
            }
        }
        hits.sort_by(|a, b| id_order(&a.id, &b.id));
        hits.truncate(size);
        Ok(hits)
    }

    async fn refresh(&self, _index: &str) -> IndexResult<()> {
        self.check_available()
    }
}

#[async_trait]
impl Backend for InMemorySearchIndex {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        self.check_available().map_err(|e| BackendError::Unavailable {
            backend_name: "memory".to_string(),
            message: e.to_string(),
        })
    }

    async fn initialize(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
