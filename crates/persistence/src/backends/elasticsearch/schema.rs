//! Elasticsearch index schema and mapping definitions.
//!
//! The mapping is derived from [`DocumentField`] so that every searchable
//! field is indexed with the type its converter produces. Keyword fields are
//! mapped as `keyword`, never `text`, so `terms` queries match exact values.

use elasticsearch::indices::{IndicesCreateParts, IndicesExistsParts};
use serde_json::{Map, Value, json};

use crate::error::{IndexError, IndexResult};
use crate::search::{DocumentField, FieldKind};

use super::backend::{ElasticsearchBackend, IndexSettings};

/// Creates the index body (settings and mappings) for employee documents.
pub fn create_index_mapping(settings: &IndexSettings) -> Value {
    let mut properties = Map::new();
    for field in DocumentField::ALL {
        let kind = field.kind();
        let mut mapping = json!({ "type": kind.mapping_type() });
        if kind == FieldKind::Date {
            mapping["format"] = json!("yyyy-MM-dd");
        }
        properties.insert(field.field_name().to_string(), mapping);
    }

    json!({
        "settings": {
            "number_of_shards": settings.number_of_shards,
            "number_of_replicas": settings.number_of_replicas,
            "index.max_result_window": settings.max_result_window,
            "refresh_interval": settings.refresh_interval
        },
        "mappings": {
            "dynamic": false,
            "properties": properties
        }
    })
}

/// Ensures `index` exists, creating it with the employee mapping if necessary.
pub async fn ensure_index(backend: &ElasticsearchBackend, index: &str) -> IndexResult<()> {
    let exists_response = backend
        .client()
        .indices()
        .exists(IndicesExistsParts::Index(&[index]))
        .send()
        .await
        .map_err(|e| IndexError::Unavailable {
            backend_name: "elasticsearch".to_string(),
            message: format!("Failed to check index existence: {}", e),
        })?;

    if exists_response.status_code().is_success() {
        return Ok(());
    }

    let mapping = create_index_mapping(&backend.config().index);

    let response = backend
        .client()
        .indices()
        .create(IndicesCreateParts::Index(index))
        .body(mapping)
        .send()
        .await
        .map_err(|e| IndexError::Unavailable {
            backend_name: "elasticsearch".to_string(),
            message: format!("Failed to create index {}: {}", index, e),
        })?;

    let status = response.status_code();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        // Created concurrently by another writer
        if body.contains("resource_already_exists_exception") {
            return Ok(());
        }
        return Err(IndexError::Rejected {
            backend_name: "elasticsearch".to_string(),
            message: format!("Failed to create index {} (status {}): {}", index, status, body),
        });
    }

    tracing::info!(index = %index, "Created Elasticsearch index");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_index_mapping_structure() {
        let mapping = create_index_mapping(&IndexSettings::default());

        assert_eq!(mapping["settings"]["number_of_shards"], 1);
        assert_eq!(mapping["settings"]["index.max_result_window"], 10000);

        let props = &mapping["mappings"]["properties"];
        assert_eq!(props["id"]["type"], "long");
        assert_eq!(props["username"]["type"], "keyword");
        assert_eq!(props["department"]["type"], "keyword");
        assert_eq!(props["age"]["type"], "long");
        assert_eq!(props["salary"]["type"], "double");
        assert_eq!(props["hire_date"]["type"], "date");
        assert_eq!(props["hire_date"]["format"], "yyyy-MM-dd");
        assert_eq!(
            props.as_object().unwrap().len(),
            DocumentField::ALL.len()
        );
    }
}
