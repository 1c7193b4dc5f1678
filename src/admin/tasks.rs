//! Background task registry for admin-triggered indexing runs

use crate::search::{SearchError, SearchResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Lifecycle of a background task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Started,
    Progress,
    Success,
    Failure,
}

impl TaskState {
    pub fn is_finished(self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failure)
    }
}

/// Pollable snapshot of one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_id: Uuid,
    pub action: String,
    pub state: TaskState,
    pub progress: Option<Value>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

type TaskTable = Arc<DashMap<Uuid, TaskStatus>>;

/// Write access to one task's status, handed to the running work
#[derive(Clone)]
pub struct TaskHandle {
    task_id: Uuid,
    tasks: TaskTable,
}

impl TaskHandle {
    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    /// Publish progress; moves the task to `PROGRESS`
    pub fn report_progress(&self, progress: Value) {
        self.update(|status| {
            status.state = TaskState::Progress;
            status.progress = Some(progress);
        });
    }

    fn update(&self, apply: impl FnOnce(&mut TaskStatus)) {
        if let Some(mut status) = self.tasks.get_mut(&self.task_id) {
            apply(&mut status);
            status.updated_at = Utc::now();
        }
    }
}

const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

/// In-process task registry; tasks run on the tokio runtime.
/// Finished tasks are pruned once they are older than the retention window.
#[derive(Clone)]
pub struct TaskManager {
    tasks: TaskTable,
    retention: Duration,
}

impl Default for TaskManager {
    fn default() -> Self {
        Self {
            tasks: TaskTable::default(),
            retention: DEFAULT_RETENTION,
        }
    }
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Register a task and run `work` in the background; returns its id
    pub fn spawn<F, Fut>(&self, action: &str, work: F) -> Uuid
    where
        F: FnOnce(TaskHandle) -> Fut,
        Fut: Future<Output = SearchResult<Value>> + Send + 'static,
    {
        let now = Utc::now();
        let cutoff = chrono::Duration::from_std(self.retention)
            .ok()
            .and_then(|window| now.checked_sub_signed(window));
        if let Some(cutoff) = cutoff {
            let pruned = self.prune_finished(cutoff);
            if pruned > 0 {
                debug!(pruned, "Pruned expired tasks");
            }
        }

        let task_id = Uuid::new_v4();
        self.tasks.insert(
            task_id,
            TaskStatus {
                task_id,
                action: action.to_string(),
                state: TaskState::Pending,
                progress: None,
                result: None,
                error: None,
                created_at: now,
                updated_at: now,
            },
        );

        let handle = TaskHandle {
            task_id,
            tasks: self.tasks.clone(),
        };
        let fut = work(handle.clone());
        let action = action.to_string();

        tokio::spawn(async move {
            handle.update(|status| status.state = TaskState::Started);
            info!(task_id = %task_id, action = %action, "Task started");

            let outcome = match tokio::spawn(fut).await {
                Ok(result) => result.map_err(|e| format_task_error(&e)),
                Err(join_error) => Err(format!("TaskAborted: {}", join_error)),
            };

            match outcome {
                Ok(result) => {
                    info!(task_id = %task_id, action = %action, "Task succeeded");
                    handle.update(|status| {
                        status.state = TaskState::Success;
                        status.result = Some(result);
                    });
                }
                Err(message) => {
                    error!(task_id = %task_id, action = %action, error = %message, "Task failed");
                    handle.update(|status| {
                        status.state = TaskState::Failure;
                        status.error = Some(message);
                    });
                }
            }
        });

        task_id
    }

    pub fn status(&self, task_id: &Uuid) -> Option<TaskStatus> {
        self.tasks.get(task_id).map(|status| status.clone())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drop finished tasks last updated before `cutoff`
    pub fn prune_finished(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.tasks.len();
        self.tasks
            .retain(|_, status| !(status.state.is_finished() && status.updated_at < cutoff));
        before - self.tasks.len()
    }
}

/// `"<ErrorKind>: <message>"`
fn format_task_error(err: &SearchError) -> String {
    format!("{}: {}", err.kind(), err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    async fn wait_finished(manager: &TaskManager, task_id: Uuid) -> TaskStatus {
        for _ in 0..200 {
            if let Some(status) = manager.status(&task_id) {
                if status.state.is_finished() {
                    return status;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("task {} did not finish", task_id);
    }

    #[tokio::test]
    async fn test_successful_task() {
        let manager = TaskManager::new();
        let task_id = manager.spawn("reindex", |handle| async move {
            handle.report_progress(json!({ "current": 1, "total": 2 }));
            Ok(json!({ "indexed": 2 }))
        });

        let status = wait_finished(&manager, task_id).await;
        assert_eq!(status.state, TaskState::Success);
        assert_eq!(status.result, Some(json!({ "indexed": 2 })));
        assert_eq!(status.progress, Some(json!({ "current": 1, "total": 2 })));
        assert_eq!(status.action, "reindex");
    }

    #[tokio::test]
    async fn test_failed_task_reports_kind_and_message() {
        let manager = TaskManager::new();
        let task_id = manager.spawn("clear", |_| async move {
            Err(SearchError::EngineUnavailable("connection refused".into()))
        });

        let status = wait_finished(&manager, task_id).await;
        assert_eq!(status.state, TaskState::Failure);
        let error = status.error.unwrap();
        assert!(error.starts_with("EngineUnavailable: "));
        assert!(error.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_state_serialization_and_prune() {
        assert_eq!(
            serde_json::to_value(TaskState::Progress).unwrap(),
            json!("PROGRESS")
        );

        let manager = TaskManager::new();
        let task_id = manager.spawn("reindex", |_| async move { Ok(Value::Null) });
        wait_finished(&manager, task_id).await;
        assert_eq!(manager.prune_finished(Utc::now() + chrono::Duration::seconds(1)), 1);
        assert!(manager.status(&task_id).is_none());
    }

    #[tokio::test]
    async fn test_spawn_prunes_expired_tasks() {
        let manager = TaskManager::new().with_retention(Duration::ZERO);
        let first = manager.spawn("reindex", |_| async move { Ok(Value::Null) });
        wait_finished(&manager, first).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        let running = manager.spawn("reindex", |_| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(Value::Null)
        });
        assert!(manager.status(&first).is_none());
        assert_eq!(manager.len(), 1);

        // Unfinished tasks survive pruning regardless of age
        manager.spawn("clear", |_| async move { Ok(Value::Null) });
        assert!(manager.status(&running).is_some());
    }

    #[tokio::test]
    async fn test_tasks_within_retention_are_kept() {
        let manager = TaskManager::new();
        assert_eq!(manager.retention(), Duration::from_secs(3600));
        let first = manager.spawn("reindex", |_| async move { Ok(Value::Null) });
        wait_finished(&manager, first).await;
        manager.spawn("reindex", |_| async move { Ok(Value::Null) });
        assert!(manager.status(&first).is_some());
    }
}
