//! Query translation and the read path over indexed scribes

use manuscript_search::config::QueryConfig;
use manuscript_search::indexing::IndexingOrchestrator;
use manuscript_search::search::{
    all_index_types, compile_filter, parse_search_query, resolve_segment, IndexRegistry,
    IndexType, MemoryEngine, QueryParams, SearchService,
};
use manuscript_search::source::JsonCatalogSource;
use serde_json::json;
use std::sync::Arc;

fn params(pairs: &[(&str, &str)]) -> QueryParams {
    pairs.iter().copied().collect()
}

async fn indexed_scribes() -> (SearchService, Arc<MemoryEngine>) {
    let engine = Arc::new(MemoryEngine::new());
    let registry = Arc::new(IndexRegistry::new());
    let source = Arc::new(
        JsonCatalogSource::from_value(json!({
            "scribes": [
                { "id": 1, "name": "Wulfstan", "scriptorium": "Worcester" },
                { "id": 2, "name": "Eadwig Basan", "scriptorium": "Canterbury" },
                { "id": 3, "name": "Hemming", "scriptorium": "Worcester" }
            ]
        }))
        .unwrap(),
    );
    IndexingOrchestrator::new(engine.clone(), source, registry.clone())
        .reindex(IndexType::Scribes, None)
        .await
        .unwrap();
    (SearchService::new(engine.clone(), registry), engine)
}

#[test]
fn test_every_segment_resolves_back() {
    for index_type in all_index_types() {
        assert_eq!(resolve_segment(index_type.segment()).unwrap(), index_type);
    }
    assert!(resolve_segment("not-a-real-index").is_err());
}

#[test]
fn test_facet_selection_compiles_to_equality() {
    let registry = IndexRegistry::new();
    let query = parse_search_query(
        registry.get(IndexType::ItemParts),
        &params(&[("selected_facets", "type_exact:charter")]),
        &QueryConfig::default(),
    );
    assert_eq!(compile_filter(&query.filters).as_deref(), Some(r#"type = "charter""#));

    let query = parse_search_query(
        registry.get(IndexType::ItemParts),
        &params(&[("type", "charter"), ("type", "letter")]),
        &QueryConfig::default(),
    );
    assert_eq!(
        compile_filter(&query.filters).as_deref(),
        Some(r#"(type = "charter" OR type = "letter")"#)
    );
}

#[test]
fn test_unknown_attributes_are_dropped() {
    let registry = IndexRegistry::new();
    let query = parse_search_query(
        registry.get(IndexType::Scribes),
        &params(&[("shelfmark", "MS 1"), ("scriptorium", "Worcester")]),
        &QueryConfig::default(),
    );
    let attributes: Vec<&str> = query.filters.attributes().collect();
    assert_eq!(attributes, vec!["scriptorium"]);
}

#[test]
fn test_date_window_parameters() {
    let registry = IndexRegistry::new();
    let query = parse_search_query(
        registry.get(IndexType::ItemParts),
        &params(&[
            ("min_date", "900"),
            ("at_most_or_least", "at most"),
            ("date_diff", "50"),
        ]),
        &QueryConfig::default(),
    );
    let filter = compile_filter(&query.filters).unwrap();
    assert!(filter.contains("date_min >= 900"));
    assert!(filter.contains("date_max <= 950"));

    // Scribes carry no dates, so the window is dropped entirely
    let query = parse_search_query(
        registry.get(IndexType::Scribes),
        &params(&[("min_date", "900"), ("max_date", "1000")]),
        &QueryConfig::default(),
    );
    assert_eq!(compile_filter(&query.filters), None);
}

#[test]
fn test_limits_and_sort() {
    let registry = IndexRegistry::new();
    let scribes = registry.get(IndexType::Scribes);
    let config = QueryConfig::default();

    assert_eq!(parse_search_query(scribes, &params(&[("limit", "500")]), &config).limit, 100);
    assert_eq!(parse_search_query(scribes, &params(&[("limit", "abc")]), &config).limit, 20);
    assert_eq!(parse_search_query(scribes, &params(&[]), &config).limit, 20);

    let query = parse_search_query(scribes, &params(&[("ordering", "-name")]), &config);
    assert_eq!(query.sort.unwrap().to_engine(), "name:desc");
    let query = parse_search_query(scribes, &params(&[("sort", "period:asc")]), &config);
    assert!(query.sort.is_none());
}

#[tokio::test]
async fn test_search_and_facets_over_indexed_documents() {
    let (service, engine) = indexed_scribes().await;
    let registry = IndexRegistry::new();
    let scribes = registry.get(IndexType::Scribes);

    let query = parse_search_query(
        scribes,
        &params(&[("q", "worcester"), ("sort", "name:asc")]),
        &QueryConfig::default(),
    );
    let page = service.search(IndexType::Scribes, &query).await.unwrap();
    assert_eq!(page.total, 2);
    let names: Vec<&str> = page.hits.iter().filter_map(|hit| hit["name"].as_str()).collect();
    assert_eq!(names, vec!["Hemming", "Wulfstan"]);

    let query = parse_search_query(scribes, &params(&[]), &QueryConfig::default());
    let faceted = service.faceted_search(IndexType::Scribes, &query).await.unwrap();
    assert_eq!(faceted.page.total, 3);
    assert_eq!(faceted.facets.distribution["scriptorium"]["Worcester"], 2);

    let facets = service
        .get_facets(IndexType::Scribes, &query, &["scriptorium".to_string()])
        .await
        .unwrap();
    assert_eq!(facets.distribution["scriptorium"]["Canterbury"], 1);
    let (_, request) = engine.last_search().unwrap();
    assert_eq!(request.limit, 0);
}

#[tokio::test]
async fn test_document_lookup() {
    let (service, _) = indexed_scribes().await;

    let doc = service.get_document(IndexType::Scribes, "2").await.unwrap();
    assert_eq!(doc.unwrap()["name"], "Eadwig Basan");
    assert!(service
        .get_document(IndexType::Scribes, "99")
        .await
        .unwrap()
        .is_none());
}
