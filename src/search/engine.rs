//! Search engine adapter boundary

use super::document::SearchDocument;
use super::error::SearchResult;
use super::query::FacetStats;
use super::registry::IndexRegistration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Attribute declarations pushed to the engine for one index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSettings {
    pub filterable_attributes: Vec<String>,
    pub sortable_attributes: Vec<String>,
    pub searchable_attributes: Vec<String>,
}

impl From<&IndexRegistration> for IndexSettings {
    fn from(registration: &IndexRegistration) -> Self {
        fn owned(names: &[&str]) -> Vec<String> {
            names.iter().map(|name| name.to_string()).collect()
        }
        Self {
            filterable_attributes: owned(registration.filterable_attributes),
            sortable_attributes: owned(registration.sortable_attributes),
            searchable_attributes: owned(registration.searchable_attributes),
        }
    }
}

/// Search request in the engine's wire shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSearchRequest {
    pub q: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sort: Vec<String>,
    pub limit: usize,
    pub offset: usize,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub facets: Vec<String>,
}

/// Search response in the engine's wire shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSearchResponse {
    #[serde(default)]
    pub hits: Vec<Value>,
    #[serde(default)]
    pub estimated_total_hits: u64,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub facet_distribution: Option<BTreeMap<String, BTreeMap<String, u64>>>,
    #[serde(default)]
    pub facet_stats: Option<BTreeMap<String, FacetStats>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineIndexStats {
    pub number_of_documents: u64,
}

/// Operations the indexing and query paths need from a search engine.
///
/// Index names are engine uids (prefix included). Writes upsert by `id`.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Whether the engine answers its health probe
    async fn health(&self) -> bool;

    /// Create the index if missing and push its attribute settings
    async fn ensure_index_and_settings(&self, uid: &str, settings: &IndexSettings)
        -> SearchResult<()>;

    /// Upsert a batch of documents
    async fn add_documents(&self, uid: &str, documents: &[SearchDocument]) -> SearchResult<()>;

    /// Remove every document; a missing index is not an error
    async fn delete_all(&self, uid: &str) -> SearchResult<()>;

    async fn search(&self, uid: &str, request: &EngineSearchRequest)
        -> SearchResult<EngineSearchResponse>;

    /// Single document by id; `None` when absent
    async fn get_document(&self, uid: &str, id: &str) -> SearchResult<Option<Value>>;

    /// Document count; a missing index counts zero
    async fn stats(&self, uid: &str) -> SearchResult<EngineIndexStats>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{IndexRegistry, IndexType};
    use serde_json::json;

    #[test]
    fn test_request_serialization_omits_empty_parts() {
        let request = EngineSearchRequest {
            q: "charter".into(),
            limit: 20,
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "q": "charter", "limit": 20, "offset": 0 })
        );
    }

    #[test]
    fn test_response_deserialization() {
        let response: EngineSearchResponse = serde_json::from_value(json!({
            "hits": [{ "id": 1 }],
            "estimatedTotalHits": 41,
            "limit": 1,
            "offset": 0,
            "processingTimeMs": 2,
            "facetDistribution": { "type": { "charter": 40, "letter": 1 } },
            "facetStats": { "date_min": { "min": 700.0, "max": 1100.0 } }
        }))
        .unwrap();
        assert_eq!(response.estimated_total_hits, 41);
        assert_eq!(response.facet_distribution.unwrap()["type"]["charter"], 40);
        assert_eq!(response.facet_stats.unwrap()["date_min"].max, 1100.0);
    }

    #[test]
    fn test_settings_from_registration() {
        let registry = IndexRegistry::new();
        let settings = IndexSettings::from(registry.get(IndexType::Scribes));
        assert_eq!(settings.sortable_attributes, vec!["id", "name", "scriptorium"]);
        assert_eq!(
            serde_json::to_value(&settings).unwrap()["searchableAttributes"],
            json!(["name", "scriptorium"])
        );
    }
}
