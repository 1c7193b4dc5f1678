//! Catalogue search: index registry, query translation and the engine boundary
//!
//! This module owns everything between an HTTP query string and the
//! search engine:
//!
//! - **Registry**: one immutable [`IndexRegistration`] per [`IndexType`]
//!   (source model, document builder, attribute allow-lists)
//! - **Translation**: request parameters become a validated [`SearchQuery`],
//!   whose [`FilterSpec`] compiles to the engine filter grammar
//! - **Engine boundary**: the [`SearchEngine`] trait, implemented over
//!   Meilisearch's REST API and in memory
//! - **Read path**: [`SearchService`] for search, facets and lookups
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  query params ─► translator ─► SearchQuery   │
//! │                      │  (sanitize against    │
//! │                      │   the registry)       │
//! └──────────────────────┼───────────────────────┘
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │  SearchService                               │
//! │  - search()  - faceted_search()              │
//! │  - get_facets()  - get_document()            │
//! └──────────────────────┬───────────────────────┘
//!                        ▼ compile_filter()
//! ┌──────────────────────────────────────────────┐
//! │  dyn SearchEngine                            │
//! │  MeilisearchEngine | MemoryEngine            │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use manuscript_search::config::QueryConfig;
//! use manuscript_search::search::{
//!     parse_search_query, IndexRegistry, IndexType, MemoryEngine, QueryParams, SearchService,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(IndexRegistry::new());
//!     let service = SearchService::new(Arc::new(MemoryEngine::new()), registry.clone());
//!
//!     let params: QueryParams = [("q", "charter"), ("selected_facets", "type_exact:charter")]
//!         .into_iter()
//!         .collect();
//!     let query = parse_search_query(
//!         registry.get(IndexType::ItemParts),
//!         &params,
//!         &QueryConfig::default(),
//!     );
//!
//!     let page = service.search(IndexType::ItemParts, &query).await?;
//!     println!("Found {} item parts", page.total);
//!     Ok(())
//! }
//! ```

mod document;
mod engine;
mod error;
pub mod filter;
mod index_type;
mod meilisearch;
mod memory;
pub mod query;
mod registry;
mod service;
pub mod translator;

pub use document::{FieldValue, SearchDocument};
pub use engine::{
    EngineIndexStats, EngineSearchRequest, EngineSearchResponse, IndexSettings, SearchEngine,
};
pub use error::{SearchError, SearchResult};
pub use filter::compile_filter;
pub use index_type::{all_index_types, resolve_segment, IndexType, SourceModel};
pub use meilisearch::MeilisearchEngine;
pub use memory::{MemoryEngine, WriteRecord};
pub use query::{
    DateBound, FacetResult, FacetStats, FacetedSearch, FilterScalar, FilterSpec, FilterValue,
    NumericRange, SearchHits, SearchQuery, SortDirection, SortSpec, DEFAULT_LIMIT, MAX_LIMIT,
};
pub use registry::{IndexRegistration, IndexRegistry};
pub use service::SearchService;
pub use translator::{parse_search_query, sanitize_filters, QueryParams};
