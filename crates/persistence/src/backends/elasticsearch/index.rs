//! SearchIndex implementation for Elasticsearch.

use async_trait::async_trait;
use elasticsearch::indices::IndicesRefreshParts;
use elasticsearch::{IndexParts, SearchParts};
use serde_json::Value;

use crate::core::{SearchHit, SearchIndex};
use crate::error::{IndexError, IndexResult};
use crate::search::CompiledQuery;

use super::backend::ElasticsearchBackend;
use super::schema;

fn unavailable(message: String) -> IndexError {
    IndexError::Unavailable {
        backend_name: "elasticsearch".to_string(),
        message,
    }
}

fn rejected(message: String) -> IndexError {
    IndexError::Rejected {
        backend_name: "elasticsearch".to_string(),
        message,
    }
}

/// Extracts id and source from a search response body.
pub(crate) fn parse_hits(body: &Value) -> Vec<SearchHit> {
    body.get("hits")
        .and_then(|h| h.get("hits"))
        .and_then(|h| h.as_array())
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| {
                    let id = hit.get("_id")?.as_str()?.to_string();
                    let source = hit.get("_source")?.clone();
                    Some(SearchHit { id, source })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl SearchIndex for ElasticsearchBackend {
    fn backend_name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn ensure_index(&self, index: &str) -> IndexResult<()> {
        schema::ensure_index(self, index).await
    }

    async fn upsert(&self, index: &str, id: &str, source: &Value) -> IndexResult<String> {
        let response = self
            .client()
            .index(IndexParts::IndexId(index, id))
            .body(source)
            .send()
            .await
            .map_err(|e| unavailable(format!("Failed to index document {}: {}", id, e)))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejected(format!(
                "Failed to index document {} (status {}): {}",
                id, status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| rejected(format!("Failed to parse index response: {}", e)))?;

        Ok(body
            .get("_id")
            .and_then(|v| v.as_str())
            .unwrap_or(id)
            .to_string())
    }

    async fn search(&self, index: &str, query: &CompiledQuery) -> IndexResult<Vec<SearchHit>> {
        let response = self
            .client()
            .search(SearchParts::Index(&[index]))
            .body(query.body())
            .send()
            .await
            .map_err(|e| unavailable(format!("Search on {} failed: {}", index, e)))?;

        if !response.status_code().is_success() {
            let status = response.status_code();
            let body = response.text().await.unwrap_or_default();
            // Nothing has been indexed yet
            if body.contains("index_not_found_exception") {
                tracing::debug!(index = %index, "Search on missing index");
                return Ok(Vec::new());
            }
            return Err(rejected(format!(
                "Search on {} failed (status {}): {}",
                index, status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| rejected(format!("Failed to parse search response: {}", e)))?;

        Ok(parse_hits(&body))
    }

    async fn refresh(&self, index: &str) -> IndexResult<()> {
        let response = self
            .client()
            .indices()
            .refresh(IndicesRefreshParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| unavailable(format!("Failed to refresh index {}: {}", index, e)))?;

        if !response.status_code().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejected(format!("Failed to refresh index {}: {}", index, body)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_hits() {
        let body = json!({
            "hits": {
                "total": {"value": 2},
                "hits": [
                    {"_id": "1", "_source": {"id": 1, "username": "a"}},
                    {"_id": "2", "_source": {"id": 2, "username": "b"}},
                    {"_id": "3"}
                ]
            }
        });
        let hits = parse_hits(&body);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "1");
        assert_eq!(hits[1].source["username"], "b");
    }

    #[test]
    fn test_parse_hits_empty_body() {
        assert!(parse_hits(&json!({})).is_empty());
    }
}
