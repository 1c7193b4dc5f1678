//! Indexing pipeline: source records -> document builders -> search engine
//!
//! Runs are plain async functions on [`IndexingOrchestrator`]. Batches of
//! one run are written strictly in sequence; separate index types may be
//! rebuilt concurrently. Task bookkeeping lives in [`crate::admin`].

pub mod metrics;
mod orchestrator;
mod retry;

pub use metrics::{gather_metrics, init_indexing_metrics, INDEXING_METRICS};
pub use orchestrator::{
    CatalogueProgress, CatalogueProgressFn, IndexCounts, IndexingOrchestrator, ProgressFn,
    DEFAULT_BATCH_SIZE,
};
pub use retry::{retry, RetryConfig};
