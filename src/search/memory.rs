//! In-process [`SearchEngine`]
//!
//! Keeps documents per index in memory and records every write and search
//! request. Text matching is a case-insensitive substring test over string
//! fields; filter expressions are recorded but not evaluated.

use super::document::SearchDocument;
use super::engine::{
    EngineIndexStats, EngineSearchRequest, EngineSearchResponse, IndexSettings, SearchEngine,
};
use super::error::{SearchError, SearchResult};
use super::query::FacetStats;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct MemoryIndex {
    settings: IndexSettings,
    /// Insertion order, replaced in place on upsert
    documents: Vec<(String, Value)>,
}

/// One recorded `add_documents` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub uid: String,
    pub documents: usize,
}

#[derive(Debug)]
pub struct MemoryEngine {
    indexes: RwLock<BTreeMap<String, MemoryIndex>>,
    writes: RwLock<Vec<WriteRecord>>,
    searches: RwLock<Vec<(String, EngineSearchRequest)>>,
    failing_writes: AtomicUsize,
    healthy: AtomicBool,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            indexes: RwLock::new(BTreeMap::new()),
            writes: RwLock::new(Vec::new()),
            searches: RwLock::new(Vec::new()),
            failing_writes: AtomicUsize::new(0),
            healthy: AtomicBool::new(true),
        }
    }

    /// Make the next `count` document writes fail with a transient error
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Successful `add_documents` calls, oldest first
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.writes.read().clone()
    }

    pub fn last_search(&self) -> Option<(String, EngineSearchRequest)> {
        self.searches.read().last().cloned()
    }

    pub fn settings(&self, uid: &str) -> Option<IndexSettings> {
        self.indexes.read().get(uid).map(|index| index.settings.clone())
    }

    pub fn documents(&self, uid: &str) -> Vec<Value> {
        self.indexes
            .read()
            .get(uid)
            .map(|index| index.documents.iter().map(|(_, doc)| doc.clone()).collect())
            .unwrap_or_default()
    }

    pub fn index_uids(&self) -> Vec<String> {
        self.indexes.read().keys().cloned().collect()
    }

    fn take_failure(&self) -> bool {
        self.failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl SearchEngine for MemoryEngine {
    async fn health(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn ensure_index_and_settings(
        &self,
        uid: &str,
        settings: &IndexSettings,
    ) -> SearchResult<()> {
        let mut indexes = self.indexes.write();
        indexes.entry(uid.to_string()).or_default().settings = settings.clone();
        Ok(())
    }

    async fn add_documents(&self, uid: &str, documents: &[SearchDocument]) -> SearchResult<()> {
        if self.take_failure() {
            return Err(SearchError::EngineUnavailable(format!(
                "injected write failure for {}",
                uid
            )));
        }

        {
            let mut indexes = self.indexes.write();
            let index = indexes.entry(uid.to_string()).or_default();
            for document in documents {
                let Some(id) = document.id_string() else {
                    return Err(SearchError::EngineRejected {
                        status: 400,
                        message: "document has no id".to_string(),
                    });
                };
                let value = document.to_json();
                match index.documents.iter_mut().find(|(existing, _)| *existing == id) {
                    Some(slot) => slot.1 = value,
                    None => index.documents.push((id, value)),
                }
            }
        }

        self.writes.write().push(WriteRecord {
            uid: uid.to_string(),
            documents: documents.len(),
        });
        Ok(())
    }

    async fn delete_all(&self, uid: &str) -> SearchResult<()> {
        if let Some(index) = self.indexes.write().get_mut(uid) {
            index.documents.clear();
        }
        Ok(())
    }

    async fn search(
        &self,
        uid: &str,
        request: &EngineSearchRequest,
    ) -> SearchResult<EngineSearchResponse> {
        self.searches
            .write()
            .push((uid.to_string(), request.clone()));

        let indexes = self.indexes.read();
        let Some(index) = indexes.get(uid) else {
            return Err(SearchError::EngineRejected {
                status: 404,
                message: format!("Index `{}` not found.", uid),
            });
        };

        let term = request.q.to_lowercase();
        let mut matched: Vec<&Value> = index
            .documents
            .iter()
            .map(|(_, doc)| doc)
            .filter(|doc| term.is_empty() || matches_term(doc, &term))
            .collect();

        if let Some((attribute, descending)) = request.sort.first().and_then(|s| parse_sort(s)) {
            matched.sort_by(|a, b| {
                let ordering = compare_values(a.get(attribute), b.get(attribute));
                if descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        let (facet_distribution, facet_stats) = if request.facets.is_empty() {
            (None, None)
        } else {
            let (distribution, stats) = compute_facets(&matched, &request.facets);
            (Some(distribution), Some(stats))
        };

        let hits = matched
            .iter()
            .skip(request.offset)
            .take(request.limit)
            .map(|doc| (*doc).clone())
            .collect();

        Ok(EngineSearchResponse {
            hits,
            estimated_total_hits: matched.len() as u64,
            limit: request.limit,
            offset: request.offset,
            facet_distribution,
            facet_stats,
        })
    }

    async fn get_document(&self, uid: &str, id: &str) -> SearchResult<Option<Value>> {
        Ok(self.indexes.read().get(uid).and_then(|index| {
            index
                .documents
                .iter()
                .find(|(existing, _)| existing == id)
                .map(|(_, doc)| doc.clone())
        }))
    }

    async fn stats(&self, uid: &str) -> SearchResult<EngineIndexStats> {
        Ok(EngineIndexStats {
            number_of_documents: self
                .indexes
                .read()
                .get(uid)
                .map(|index| index.documents.len() as u64)
                .unwrap_or(0),
        })
    }
}

fn matches_term(doc: &Value, term: &str) -> bool {
    match doc {
        Value::String(s) => s.to_lowercase().contains(term),
        Value::Array(items) => items.iter().any(|item| matches_term(item, term)),
        Value::Object(fields) => fields.values().any(|value| matches_term(value, term)),
        _ => false,
    }
}

fn parse_sort(expression: &str) -> Option<(&str, bool)> {
    let (attribute, direction) = expression.rsplit_once(':')?;
    Some((attribute, direction == "desc"))
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        _ => CmpOrdering::Equal,
    }
}

type Distribution = BTreeMap<String, BTreeMap<String, u64>>;

fn compute_facets(docs: &[&Value], facets: &[String]) -> (Distribution, BTreeMap<String, FacetStats>) {
    let mut distribution = Distribution::new();
    let mut stats: BTreeMap<String, FacetStats> = BTreeMap::new();

    for attribute in facets {
        let counts = distribution.entry(attribute.clone()).or_default();
        for doc in docs {
            let values: Vec<&Value> = match doc.get(attribute) {
                Some(Value::Array(items)) => items.iter().collect(),
                Some(Value::Null) | None => Vec::new(),
                Some(value) => vec![value],
            };
            for value in values {
                let key = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                *counts.entry(key).or_insert(0) += 1;

                if let Some(n) = value.as_f64() {
                    stats
                        .entry(attribute.clone())
                        .and_modify(|s| {
                            s.min = s.min.min(n);
                            s.max = s.max.max(n);
                        })
                        .or_insert(FacetStats { min: n, max: n });
                }
            }
        }
    }

    (distribution, stats)
}
