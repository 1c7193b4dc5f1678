//! Record source backed by a JSON catalogue export

use super::{DomainObject, Record, RecordSource};
use crate::search::{IndexType, SearchError, SearchResult, SourceModel};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

/// In-memory, read-only catalogue keyed by source model.
///
/// The export is a JSON object whose keys are collection names
/// (`item_parts`, `item_images`, `scribes`, `hands`, `graphs`,
/// `image_texts`) and whose values are arrays of nested records.
#[derive(Default)]
pub struct JsonCatalogSource {
    collections: HashMap<SourceModel, Vec<(i64, Record)>>,
}

impl JsonCatalogSource {
    pub fn from_value(export: Value) -> SearchResult<Self> {
        let Value::Object(mut root) = export else {
            return Err(SearchError::Source(
                "catalogue export must be a JSON object".to_string(),
            ));
        };

        let mut collections = HashMap::new();
        for model in SourceModel::iter() {
            let records = match root.remove(model.collection()) {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items,
                Some(_) => {
                    return Err(SearchError::Source(format!(
                        "collection '{}' must be an array",
                        model.collection()
                    )))
                }
            };

            let mut keyed: Vec<(i64, Record)> = Vec::with_capacity(records.len());
            for record in records {
                match record.primary_key() {
                    Some(pk) => keyed.push((pk, Arc::new(record) as Record)),
                    None => warn!(
                        collection = model.collection(),
                        "Skipping catalogue record without an integer id"
                    ),
                }
            }
            keyed.sort_by_key(|(pk, _)| *pk);
            keyed.dedup_by_key(|(pk, _)| *pk);

            debug!(collection = model.collection(), records = keyed.len(), "Loaded collection");
            collections.insert(model, keyed);
        }

        Ok(Self { collections })
    }

    pub async fn from_path(path: impl AsRef<Path>) -> SearchResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let source = Self::from_value(serde_json::from_str(&raw)?)?;
        info!(path = %path.display(), records = source.len(), "Catalogue export loaded");
        Ok(source)
    }

    /// Total records across every collection
    pub fn len(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn records(&self, index_type: IndexType) -> &[(i64, Record)] {
        self.collections
            .get(&index_type.source_model())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordSource for JsonCatalogSource {
    async fn count(&self, index_type: IndexType) -> SearchResult<u64> {
        Ok(self.records(index_type).len() as u64)
    }

    async fn fetch_batch(
        &self,
        index_type: IndexType,
        after_pk: Option<i64>,
        limit: usize,
    ) -> SearchResult<Vec<Record>> {
        let records = self.records(index_type);
        let start = match after_pk {
            Some(pk) => records.partition_point(|(key, _)| *key <= pk),
            None => 0,
        };
        Ok(records[start..]
            .iter()
            .take(limit)
            .map(|(_, record)| Arc::clone(record))
            .collect())
    }
}
