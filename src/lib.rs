//! Search indexing and query subsystem for a manuscripts catalogue
//!
//! Catalogue records (item parts, images, scribes, hands, graphs and image
//! texts) are denormalised into flat documents and pushed to a Meilisearch
//! instance, one index per [`search::IndexType`]. Queries arrive as HTTP
//! parameters, are checked against each index's attribute allow-lists and
//! compiled to the engine's filter grammar.
//!
//! - [`search`]: registry, query translation, engine adapters, read path
//! - [`documents`]: per-index document builders and the markup parser
//! - [`indexing`]: batched reindex runs with retry and metrics
//! - [`admin`]: stats and background indexing tasks
//! - [`api`]: axum router
//! - [`app`]: component wiring for the binaries
//! - [`source`]: the relational collaborator boundary

pub mod admin;
pub mod api;
pub mod app;
pub mod config;
pub mod documents;
pub mod error;
pub mod indexing;
pub mod search;
pub mod source;

pub use error::{AppError, Result};
