//! Relational collaborator boundary
//!
//! The indexing core reads catalogue records through [`RecordSource`] and
//! inspects them through [`DomainObject`]. [`JsonCatalogSource`] serves a
//! JSON catalogue export and backs the binaries and tests.

mod domain;
mod json;

pub use domain::{
    path_int, path_str, path_value, related, related_many, resolve_path, Attr, DomainObject,
};
pub use json::JsonCatalogSource;

use crate::search::{IndexType, SearchResult};
use async_trait::async_trait;
use std::sync::Arc;

/// A record handed from the source to document builders
pub type Record = Arc<dyn DomainObject>;

/// Batched, primary-key ordered access to the records behind an index
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Number of records behind `index_type`
    async fn count(&self, index_type: IndexType) -> SearchResult<u64>;

    /// Up to `limit` records with primary key greater than `after_pk`, ascending
    async fn fetch_batch(
        &self,
        index_type: IndexType,
        after_pk: Option<i64>,
        limit: usize,
    ) -> SearchResult<Vec<Record>>;
}
