pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::admin::AdminService;
use crate::config::QueryConfig;
use crate::search::{IndexRegistry, SearchService};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub search: SearchService,
    pub admin: AdminService,
    pub registry: Arc<IndexRegistry>,
    pub query_config: QueryConfig,
}

impl AppState {
    pub fn new(search: SearchService, admin: AdminService, registry: Arc<IndexRegistry>) -> Self {
        Self {
            search,
            admin,
            registry,
            query_config: QueryConfig::default(),
        }
    }

    /// Set page size defaults and bounds
    pub fn with_query_config(mut self, query_config: QueryConfig) -> Self {
        self.query_config = query_config;
        self
    }
}
