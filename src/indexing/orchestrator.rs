//! Write path: clear, reindex and rebuild search indexes from the record source

use super::metrics::INDEXING_METRICS;
use super::retry::{retry, RetryConfig};
use crate::config::IndexingConfig;
use crate::search::{
    IndexRegistration, IndexRegistry, IndexSettings, IndexType, SearchDocument, SearchEngine,
    SearchResult,
};
use crate::source::RecordSource;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// Default number of source records per batch
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Per-index progress: `(records processed, records in source)`
pub type ProgressFn<'a> = &'a (dyn Fn(u64, u64) + Send + Sync);

/// Catalogue-wide progress callback
pub type CatalogueProgressFn<'a> = &'a (dyn Fn(CatalogueProgress) + Send + Sync);

/// Progress of a catalogue-wide rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogueProgress {
    pub index_type: IndexType,
    /// 1-based position of `index_type` in registry order
    pub index_position: usize,
    pub index_count: usize,
    pub done: u64,
    pub total: u64,
}

/// Documents written per index, keyed by URL segment
pub type IndexCounts = BTreeMap<String, u64>;

/// Composes the registry, the record source and the engine into
/// idempotent indexing runs.
#[derive(Clone)]
pub struct IndexingOrchestrator {
    engine: Arc<dyn SearchEngine>,
    source: Arc<dyn RecordSource>,
    registry: Arc<IndexRegistry>,
    batch_size: usize,
    retry: RetryConfig,
}

impl IndexingOrchestrator {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        source: Arc<dyn RecordSource>,
        registry: Arc<IndexRegistry>,
    ) -> Self {
        Self {
            engine,
            source,
            registry,
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryConfig::default(),
        }
    }

    /// Apply batch size and retry schedule from configuration
    pub fn with_config(self, config: &IndexingConfig) -> Self {
        self.with_batch_size(config.batch_size)
            .with_retry_config(config.retry_config())
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn registry(&self) -> &IndexRegistry {
        &self.registry
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Create the index if needed and push its attribute settings
    pub async fn setup_index(&self, index_type: IndexType) -> SearchResult<()> {
        let registration = self.registry.get(index_type);
        let uid = self.registry.uid(index_type);
        self.engine
            .ensure_index_and_settings(&uid, &IndexSettings::from(registration))
            .await?;
        info!(index_type = %index_type, uid = %uid, "Index settings applied");
        Ok(())
    }

    /// Provision every index without touching documents
    pub async fn setup_all_indexes(&self) -> SearchResult<()> {
        for registration in self.registry.iter() {
            self.setup_index(registration.index_type).await?;
        }
        Ok(())
    }

    /// Delete every document of one index
    pub async fn clear(&self, index_type: IndexType) -> SearchResult<()> {
        let uid = self.registry.uid(index_type);
        self.engine.delete_all(&uid).await?;
        info!(index_type = %index_type, uid = %uid, "Index cleared");
        Ok(())
    }

    /// Rebuild one index from the source; returns documents written
    #[instrument(skip_all, fields(index_type = %index_type))]
    pub async fn reindex(
        &self,
        index_type: IndexType,
        progress: Option<ProgressFn<'_>>,
    ) -> SearchResult<u64> {
        let label = index_type.segment();
        let start = Instant::now();
        INDEXING_METRICS.record_run_start(label);

        let result = self.run_reindex(self.registry.get(index_type), progress).await;

        let elapsed = start.elapsed();
        INDEXING_METRICS.record_run_complete(label, result.is_ok(), elapsed.as_secs_f64());
        match &result {
            Ok(written) => info!(
                documents = written,
                elapsed_ms = elapsed.as_millis() as u64,
                "Reindex complete"
            ),
            Err(e) => error!(error = %e, "Reindex failed"),
        }
        result
    }

    /// Clear then reindex; the index is empty between the two phases
    pub async fn clear_and_reindex(
        &self,
        index_type: IndexType,
        progress: Option<ProgressFn<'_>>,
    ) -> SearchResult<u64> {
        self.clear(index_type).await?;
        self.reindex(index_type, progress).await
    }

    /// Reindex every index in registry order, stopping at the first failure
    pub async fn reindex_all(&self) -> SearchResult<IndexCounts> {
        let mut counts = IndexCounts::new();
        for registration in self.registry.iter() {
            let written = self.reindex(registration.index_type, None).await?;
            counts.insert(registration.url_segment.to_string(), written);
        }
        Ok(counts)
    }

    /// Clear every index, then rebuild them all with catalogue-wide progress
    pub async fn clear_and_reindex_all(
        &self,
        progress: Option<CatalogueProgressFn<'_>>,
    ) -> SearchResult<IndexCounts> {
        for registration in self.registry.iter() {
            self.clear(registration.index_type).await?;
        }

        let index_count = self.registry.iter().count();
        let mut counts = IndexCounts::new();

        for (position, registration) in self.registry.iter().enumerate() {
            let index_type = registration.index_type;
            let per_index = progress.map(|report| {
                move |done: u64, total: u64| {
                    report(CatalogueProgress {
                        index_type,
                        index_position: position + 1,
                        index_count,
                        done,
                        total,
                    })
                }
            });
            let per_index = per_index
                .as_ref()
                .map(|f| f as &(dyn Fn(u64, u64) + Send + Sync));

            let written = self.reindex(index_type, per_index).await?;
            counts.insert(registration.url_segment.to_string(), written);
        }
        Ok(counts)
    }

    async fn run_reindex(
        &self,
        registration: &IndexRegistration,
        progress: Option<ProgressFn<'_>>,
    ) -> SearchResult<u64> {
        let index_type = registration.index_type;
        let uid = self.registry.uid(index_type);

        self.engine
            .ensure_index_and_settings(&uid, &IndexSettings::from(registration))
            .await?;
        self.engine.delete_all(&uid).await?;

        let total = self.source.count(index_type).await?;
        info!(uid = %uid, total, batch_size = self.batch_size, "Reindex started");

        let mut after_pk = None;
        let mut done = 0u64;
        let mut written = 0u64;
        let mut batch = 0usize;

        loop {
            let records = self
                .source
                .fetch_batch(index_type, after_pk, self.batch_size)
                .await?;
            if records.is_empty() {
                break;
            }
            batch += 1;
            after_pk = records.last().and_then(|record| record.primary_key());

            let documents: Vec<SearchDocument> = records
                .iter()
                .flat_map(|record| registration.build(record.as_ref()))
                .collect();
            done += records.len() as u64;

            if !documents.is_empty() {
                self.write_batch(index_type, &uid, &documents).await?;
                written += documents.len() as u64;
            }
            debug!(
                batch,
                records = records.len(),
                documents = documents.len(),
                done,
                total,
                "Batch indexed"
            );

            if let Some(report) = progress {
                report(done, total);
            }

            if records.len() < self.batch_size || after_pk.is_none() {
                break;
            }
        }

        Ok(written)
    }

    async fn write_batch(
        &self,
        index_type: IndexType,
        uid: &str,
        documents: &[SearchDocument],
    ) -> SearchResult<()> {
        let label = index_type.segment();
        let result = retry(
            "add_documents",
            &self.retry,
            |_, _| INDEXING_METRICS.record_retry(label),
            || self.engine.add_documents(uid, documents),
        )
        .await;
        INDEXING_METRICS.record_batch(label, documents.len(), result.is_ok());
        result
    }
}
