//! Read path: search, faceted search and single-document lookup

use super::engine::{EngineSearchRequest, EngineSearchResponse, SearchEngine};
use super::error::SearchResult;
use super::filter::compile_filter;
use super::index_type::IndexType;
use super::query::{FacetResult, FacetedSearch, SearchHits, SearchQuery};
use super::registry::IndexRegistry;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Query facade over the search engine
#[derive(Clone)]
pub struct SearchService {
    engine: Arc<dyn SearchEngine>,
    registry: Arc<IndexRegistry>,
}

impl SearchService {
    pub fn new(engine: Arc<dyn SearchEngine>, registry: Arc<IndexRegistry>) -> Self {
        Self { engine, registry }
    }

    pub fn registry(&self) -> &IndexRegistry {
        &self.registry
    }

    /// One page of hits
    pub async fn search(&self, index_type: IndexType, query: &SearchQuery) -> SearchResult<SearchHits> {
        let request = self.request(query, Vec::new());
        let response = self.execute(index_type, &request).await?;
        Ok(page_from(response, query))
    }

    /// One page of hits plus facet distributions computed under the same filter
    pub async fn faceted_search(
        &self,
        index_type: IndexType,
        query: &SearchQuery,
    ) -> SearchResult<FacetedSearch> {
        let request = self.request(query, query.facets.clone());
        let mut response = self.execute(index_type, &request).await?;
        let facets = facets_from(&mut response);
        Ok(FacetedSearch {
            page: page_from(response, query),
            facets,
        })
    }

    /// Facet distributions only; no hits are fetched
    pub async fn get_facets(
        &self,
        index_type: IndexType,
        query: &SearchQuery,
        facet_attributes: &[String],
    ) -> SearchResult<FacetResult> {
        let mut request = self.request(query, facet_attributes.to_vec());
        request.limit = 0;
        request.offset = 0;
        let mut response = self.execute(index_type, &request).await?;
        Ok(facets_from(&mut response))
    }

    /// Document by external id; `None` when the engine does not hold it
    pub async fn get_document(&self, index_type: IndexType, id: &str) -> SearchResult<Option<Value>> {
        let uid = self.registry.uid(index_type);
        self.engine.get_document(&uid, id).await
    }

    fn request(&self, query: &SearchQuery, facets: Vec<String>) -> EngineSearchRequest {
        EngineSearchRequest {
            q: query.q.clone(),
            filter: compile_filter(&query.filters),
            sort: query.sort.iter().map(|sort| sort.to_engine()).collect(),
            limit: query.limit,
            offset: query.offset,
            facets,
        }
    }

    async fn execute(
        &self,
        index_type: IndexType,
        request: &EngineSearchRequest,
    ) -> SearchResult<EngineSearchResponse> {
        let uid = self.registry.uid(index_type);
        let start = Instant::now();
        let response = self.engine.search(&uid, request).await?;
        debug!(
            index_type = %index_type,
            q = %request.q,
            filter = request.filter.as_deref().unwrap_or(""),
            hits = response.hits.len(),
            total = response.estimated_total_hits,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search executed"
        );
        Ok(response)
    }
}

fn page_from(response: EngineSearchResponse, query: &SearchQuery) -> SearchHits {
    SearchHits {
        hits: response.hits,
        total: response.estimated_total_hits,
        limit: query.limit,
        offset: query.offset,
    }
}

fn facets_from(response: &mut EngineSearchResponse) -> FacetResult {
    FacetResult {
        distribution: response.facet_distribution.take().unwrap_or_default(),
        stats: response.facet_stats.take().unwrap_or_default(),
    }
}
