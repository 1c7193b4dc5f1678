//! Component wiring shared by the server and the CLI

use crate::admin::AdminService;
use crate::api::AppState;
use crate::config::Config;
use crate::indexing::IndexingOrchestrator;
use crate::search::{
    IndexRegistry, MeilisearchEngine, MemoryEngine, SearchEngine, SearchResult, SearchService,
};
use crate::source::{JsonCatalogSource, RecordSource};
use std::sync::Arc;
use tracing::{info, warn};

/// Engine, source, registry and orchestrator built from configuration
#[derive(Clone)]
pub struct Components {
    pub engine: Arc<dyn SearchEngine>,
    pub source: Arc<dyn RecordSource>,
    pub registry: Arc<IndexRegistry>,
    pub orchestrator: IndexingOrchestrator,
}

impl Components {
    pub async fn from_config(config: &Config) -> SearchResult<Self> {
        let engine: Arc<dyn SearchEngine> = if config.meilisearch.in_memory {
            warn!("Using the in-memory search engine; documents are not persisted");
            Arc::new(MemoryEngine::new())
        } else {
            info!(url = %config.meilisearch.url, "Using Meilisearch");
            Arc::new(MeilisearchEngine::new(&config.meilisearch)?)
        };

        let source: Arc<dyn RecordSource> = match &config.source.catalogue_path {
            Some(path) => Arc::new(JsonCatalogSource::from_path(path).await?),
            None => {
                warn!("No catalogue_path configured; the record source is empty");
                Arc::new(JsonCatalogSource::default())
            }
        };

        let registry = Arc::new(IndexRegistry::with_prefix(
            config.meilisearch.index_prefix.clone(),
        ));
        let orchestrator =
            IndexingOrchestrator::new(engine.clone(), source.clone(), registry.clone())
                .with_config(&config.indexing);

        Ok(Self {
            engine,
            source,
            registry,
            orchestrator,
        })
    }

    /// HTTP application state over these components
    pub fn app_state(&self, config: &Config) -> AppState {
        let search = SearchService::new(self.engine.clone(), self.registry.clone());
        let admin = AdminService::new(
            self.engine.clone(),
            self.source.clone(),
            self.registry.clone(),
            self.orchestrator.clone(),
        )
        .with_task_retention(config.indexing.task_retention());
        AppState::new(search, admin, self.registry.clone())
            .with_query_config(config.search.clone())
    }
}
