use crate::admin::{ActionRequest, ActionResponse, SearchStats, TaskStatus};
use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::search::{
    parse_search_query, FacetStats, IndexRegistration, QueryParams, SearchHits, SearchQuery,
};
use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let search_engine = state.admin.health().await;
    Ok(Json(HealthResponse {
        status: if search_engine { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        search_engine,
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub search_engine: bool,
}

/// One page of hits
pub async fn search(
    State(state): State<AppState>,
    Path(index): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<SearchPage>> {
    let registration = state.registry.by_segment(&index)?;
    let params = QueryParams::from(pairs);
    let query = parse_search_query(registration, &params, &state.query_config);

    let page = state.search.search(registration.index_type, &query).await?;
    Ok(Json(SearchPage::from(page)))
}

#[derive(Debug, Serialize)]
pub struct SearchPage {
    pub results: Vec<Value>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

impl From<SearchHits> for SearchPage {
    fn from(page: SearchHits) -> Self {
        Self {
            results: page.hits,
            total: page.total,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

/// Hits, facet distributions, page links and ordering options
pub async fn faceted_search(
    State(state): State<AppState>,
    Path(index): Path<String>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<FacetedPage>> {
    let registration = state.registry.by_segment(&index)?;
    let params = QueryParams::from(pairs);
    let query = parse_search_query(registration, &params, &state.query_config);

    let result = state
        .search
        .faceted_search(registration.index_type, &query)
        .await?;
    let base = base_url(&headers, uri.path());
    let page = result.page;

    let next_offset = page.offset.saturating_add(page.limit);
    let has_next = (next_offset as u64) < page.total;
    let next = base
        .as_ref()
        .filter(|_| has_next)
        .map(|base| page_link(base, &params, page.limit, next_offset));
    let previous = base
        .as_ref()
        .filter(|_| page.offset > 0)
        .map(|base| page_link(base, &params, page.limit, page.offset.saturating_sub(page.limit)));

    Ok(Json(FacetedPage {
        facet_distribution: result.facets.distribution,
        facet_stats: result.facets.stats,
        results: page.hits,
        total: page.total,
        limit: page.limit,
        offset: page.offset,
        next,
        previous,
        ordering: ordering(registration, &query, &params, base.as_ref()),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetedPage {
    pub facet_distribution: BTreeMap<String, BTreeMap<String, u64>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub facet_stats: BTreeMap<String, FacetStats>,
    pub results: Vec<Value>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub ordering: Ordering,
}

#[derive(Debug, Serialize)]
pub struct Ordering {
    pub current: Option<String>,
    pub options: Vec<OrderingOption>,
}

#[derive(Debug, Serialize)]
pub struct OrderingOption {
    pub name: String,
    pub text: String,
    pub url: Option<String>,
}

/// Single document by id
pub async fn get_document(
    State(state): State<AppState>,
    Path((index, id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let registration = state.registry.by_segment(&index)?;
    state
        .search
        .get_document(registration.index_type, &id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Not found.".to_string()))
}

/// Engine vs. source counts per index
pub async fn search_stats(State(state): State<AppState>) -> Result<Json<SearchStats>> {
    Ok(Json(state.admin.stats().await))
}

/// Dispatch an indexing action as background task(s)
pub async fn start_action(
    State(state): State<AppState>,
    Json(request): Json<ActionRequest>,
) -> Result<(StatusCode, Json<ActionResponse>)> {
    let response = state.admin.start_action(&request)?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Poll a background task
pub async fn task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatus>> {
    Ok(Json(state.admin.task_status(&task_id)?))
}

/// Prometheus metrics endpoint
///
/// Returns metrics in Prometheus text exposition format
pub async fn metrics() -> (StatusCode, String) {
    (StatusCode::OK, crate::indexing::gather_metrics())
}

/// Absolute URL of the current path, honouring `X-Forwarded-Proto`
fn base_url(headers: &HeaderMap, path: &str) -> Option<Url> {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http");
    Url::parse(&format!("{}://{}{}", scheme, host, path)).ok()
}

/// Same query with `replace` applied; keys in `replace` and `drop` are removed first
fn with_params(base: &Url, params: &QueryParams, replace: &[(&str, String)], drop: &[&str]) -> String {
    let mut url = base.clone();
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (key, value) in params.iter() {
            if drop.contains(&key) || replace.iter().any(|(name, _)| *name == key) {
                continue;
            }
            query.append_pair(key, value);
        }
        for (key, value) in replace {
            query.append_pair(key, value);
        }
    }
    url.to_string()
}

fn page_link(base: &Url, params: &QueryParams, limit: usize, offset: usize) -> String {
    with_params(
        base,
        params,
        &[("limit", limit.to_string()), ("offset", offset.to_string())],
        &["page", "page_size"],
    )
}

/// Current sort plus both directions of every sortable attribute
fn ordering(
    registration: &IndexRegistration,
    query: &SearchQuery,
    params: &QueryParams,
    base: Option<&Url>,
) -> Ordering {
    let current = query.sort.as_ref().map(|sort| sort.to_ordering()).or_else(|| {
        registration
            .sortable_attributes
            .first()
            .map(|attribute| format!("-{}", attribute))
    });

    let options = registration
        .sortable_attributes
        .iter()
        .flat_map(|attribute| {
            [
                (attribute.to_string(), format!("{} (asc)", attribute)),
                (format!("-{}", attribute), format!("{} (desc)", attribute)),
            ]
        })
        .map(|(name, text)| OrderingOption {
            url: base.map(|base| {
                with_params(
                    base,
                    params,
                    &[("ordering", name.clone()), ("offset", "0".to_string())],
                    &["sort", "page"],
                )
            }),
            name,
            text,
        })
        .collect();

    Ordering { current, options }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_link_replaces_offset_and_keeps_filters() {
        let base = Url::parse("http://example.org/api/v1/search/item-parts/facets").unwrap();
        let params: QueryParams = [("q", "St Neots"), ("offset", "0"), ("page", "3"), ("type", "charter")]
            .into_iter()
            .collect();

        let link = page_link(&base, &params, 20, 40);
        assert_eq!(
            link,
            "http://example.org/api/v1/search/item-parts/facets?q=St+Neots&type=charter&limit=20&offset=40"
        );
    }

    #[test]
    fn test_base_url_uses_host_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "search.example.org".parse().unwrap());
        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        let base = base_url(&headers, "/api/v1/search/scribes/facets").unwrap();
        assert_eq!(base.as_str(), "https://search.example.org/api/v1/search/scribes/facets");
    }
}
