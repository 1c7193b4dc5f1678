//! Operational facade: engine health, sync stats and indexing actions

use super::tasks::{TaskManager, TaskStatus};
use crate::error::{AppError, Result};
use crate::indexing::{CatalogueProgress, IndexingOrchestrator};
use crate::search::{resolve_segment, IndexRegistry, IndexType, SearchEngine};
use crate::source::RecordSource;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Indexing actions an operator can dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AdminAction {
    Reindex,
    Clear,
    CleanAndReindex,
    ReindexAll,
    ClearAndRebuildAll,
}

impl AdminAction {
    /// Actions that target a single index
    pub fn is_per_index(self) -> bool {
        matches!(
            self,
            AdminAction::Reindex | AdminAction::Clear | AdminAction::CleanAndReindex
        )
    }
}

/// Body of `POST /api/v1/admin/search/actions`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ActionRequest {
    pub action: Option<String>,
    pub index_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_ids: Option<Vec<Uuid>>,
    pub message: String,
}

/// Engine vs. source counts for one index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexStats {
    pub index_type: String,
    pub uid: String,
    pub label: String,
    pub meilisearch_count: u64,
    pub db_count: u64,
    pub in_sync: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchStats {
    pub healthy: bool,
    pub total_meilisearch: u64,
    pub total_database: u64,
    pub indexes: Vec<IndexStats>,
}

impl SearchStats {
    fn unhealthy() -> Self {
        Self {
            healthy: false,
            total_meilisearch: 0,
            total_database: 0,
            indexes: Vec::new(),
        }
    }
}

/// Admin operations over the engine, the source and the task registry
#[derive(Clone)]
pub struct AdminService {
    engine: Arc<dyn SearchEngine>,
    source: Arc<dyn RecordSource>,
    registry: Arc<IndexRegistry>,
    orchestrator: IndexingOrchestrator,
    tasks: TaskManager,
}

impl AdminService {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        source: Arc<dyn RecordSource>,
        registry: Arc<IndexRegistry>,
        orchestrator: IndexingOrchestrator,
    ) -> Self {
        Self {
            engine,
            source,
            registry,
            orchestrator,
            tasks: TaskManager::new(),
        }
    }

    /// How long finished tasks stay pollable
    pub fn with_task_retention(mut self, retention: Duration) -> Self {
        self.tasks = self.tasks.with_retention(retention);
        self
    }

    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    pub async fn health(&self) -> bool {
        self.engine.health().await
    }

    /// Per-index engine and source counts; empty when the engine is down
    pub async fn stats(&self) -> SearchStats {
        if !self.health().await {
            warn!("Search engine unhealthy, skipping index stats");
            return SearchStats::unhealthy();
        }

        let indexes = join_all(
            self.registry
                .iter()
                .map(|registration| self.index_stats(registration.index_type)),
        )
        .await;

        SearchStats {
            healthy: true,
            total_meilisearch: indexes.iter().map(|i| i.meilisearch_count).sum(),
            total_database: indexes.iter().map(|i| i.db_count).sum(),
            indexes,
        }
    }

    async fn index_stats(&self, index_type: IndexType) -> IndexStats {
        let uid = self.registry.uid(index_type);
        let meilisearch_count = match self.engine.stats(&uid).await {
            Ok(stats) => stats.number_of_documents,
            Err(e) => {
                warn!(uid = %uid, error = %e, "Failed to read engine stats");
                0
            }
        };
        let db_count = match self.source.count(index_type).await {
            Ok(count) => count,
            Err(e) => {
                warn!(index_type = %index_type, error = %e, "Failed to count source records");
                0
            }
        };
        IndexStats {
            index_type: index_type.segment().to_string(),
            uid,
            label: index_type.label().to_string(),
            meilisearch_count,
            db_count,
            in_sync: meilisearch_count == db_count,
        }
    }

    /// Validate and dispatch an action as background task(s)
    pub fn start_action(&self, request: &ActionRequest) -> Result<ActionResponse> {
        let raw = request
            .action
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| AppError::Validation("Missing 'action' field.".to_string()))?;
        let action = AdminAction::from_str(raw)
            .map_err(|_| AppError::Validation(format!("Unknown action '{}'.", raw)))?;

        if action.is_per_index() {
            let segment = request
                .index_type
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "'index_type' is required for action '{}'.",
                        action
                    ))
                })?;
            let index_type = resolve_segment(segment)
                .map_err(|e| AppError::Validation(e.to_string()))?;
            let task_id = self.spawn_index_action(action, index_type);
            info!(action = %action, index_type = %index_type, task_id = %task_id, "Dispatched index action");
            return Ok(ActionResponse {
                task_id: Some(task_id),
                task_ids: None,
                message: format!("Task '{}' started for {}.", action, segment),
            });
        }

        match action {
            AdminAction::ReindexAll => {
                let task_ids = self
                    .registry
                    .iter()
                    .map(|registration| {
                        self.spawn_index_action(AdminAction::Reindex, registration.index_type)
                    })
                    .collect();
                Ok(ActionResponse {
                    task_id: None,
                    task_ids: Some(task_ids),
                    message: "Reindex started for all indexes.".to_string(),
                })
            }
            _ => {
                let task_id = self.spawn_rebuild_all();
                Ok(ActionResponse {
                    task_id: Some(task_id),
                    task_ids: None,
                    message: "Clear & rebuild all started.".to_string(),
                })
            }
        }
    }

    pub fn task_status(&self, task_id: &str) -> Result<TaskStatus> {
        Uuid::parse_str(task_id)
            .ok()
            .and_then(|id| self.tasks.status(&id))
            .ok_or_else(|| AppError::NotFound(format!("Unknown task: {}", task_id)))
    }

    fn spawn_index_action(&self, action: AdminAction, index_type: IndexType) -> Uuid {
        let orchestrator = self.orchestrator.clone();
        let segment = index_type.segment();

        self.tasks.spawn(&action.to_string(), move |handle| async move {
            let progress = move |done: u64, total: u64| {
                handle.report_progress(json!({
                    "index_type": segment,
                    "current": done,
                    "total": total,
                }))
            };
            match action {
                AdminAction::Clear => {
                    orchestrator.clear(index_type).await?;
                    Ok(json!({ "action": action, "index_type": segment }))
                }
                AdminAction::CleanAndReindex => {
                    let indexed = orchestrator
                        .clear_and_reindex(index_type, Some(&progress))
                        .await?;
                    Ok(json!({ "action": action, "index_type": segment, "indexed": indexed }))
                }
                _ => {
                    let indexed = orchestrator.reindex(index_type, Some(&progress)).await?;
                    Ok(json!({ "action": AdminAction::Reindex, "index_type": segment, "indexed": indexed }))
                }
            }
        })
    }

    fn spawn_rebuild_all(&self) -> Uuid {
        let orchestrator = self.orchestrator.clone();

        self.tasks
            .spawn(&AdminAction::ClearAndRebuildAll.to_string(), move |handle| async move {
                let progress = move |p: CatalogueProgress| {
                    handle.report_progress(json!({
                        "index_type": p.index_type.segment(),
                        "index_position": p.index_position,
                        "index_count": p.index_count,
                        "current": p.done,
                        "total": p.total,
                    }))
                };
                let counts = orchestrator.clear_and_reindex_all(Some(&progress)).await?;
                Ok(json!({
                    "action": "clear_and_reindex_all",
                    "indexed": counts.values().sum::<u64>(),
                }))
            })
    }
}
