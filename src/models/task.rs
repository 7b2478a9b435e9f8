//! Background task model module.
//!
//! Download tasks live in process memory; statuses are lost on restart.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Finished tasks older than this are dropped on the next insert.
const FINISHED_RETENTION_HOURS: i64 = 24;

/// Lifecycle of a download task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Whether the task reached a terminal state.
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Current state of one task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub status: TaskStatus,
    pub message: Option<String>,
    pub result_path: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    fn new(status: TaskStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
            result_path: None,
            updated_at: Utc::now(),
        }
    }
}

/// Shared in-memory task registry.
///
/// Cloning is cheap; all clones see the same map.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<RwLock<HashMap<String, TaskRecord>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new task in the `queued` state.
    ///
    /// Returns the number of tracked tasks after pruning.
    pub async fn enqueue(&self, task_id: &str) -> usize {
        let mut tasks = self.tasks.write().await;
        let cutoff = Utc::now() - Duration::hours(FINISHED_RETENTION_HOURS);
        tasks.retain(|_, t| !(t.status.is_finished() && t.updated_at < cutoff));
        tasks.insert(
            task_id.to_string(),
            TaskRecord::new(TaskStatus::Queued, "下载任务已加入后台队列"),
        );
        tasks.len()
    }

    /// Marks a task as processing with a progress message.
    pub async fn set_processing(&self, task_id: &str, message: impl Into<String>) {
        self.tasks.write().await.insert(
            task_id.to_string(),
            TaskRecord::new(TaskStatus::Processing, message),
        );
    }

    /// Marks a task as completed with the path of the downloaded file.
    pub async fn complete(&self, task_id: &str, message: impl Into<String>, result_path: String) {
        let mut record = TaskRecord::new(TaskStatus::Completed, message);
        record.result_path = Some(result_path);
        self.tasks.write().await.insert(task_id.to_string(), record);
    }

    /// Marks a task as failed.
    pub async fn fail(&self, task_id: &str, message: impl Into<String>) {
        self.tasks.write().await.insert(
            task_id.to_string(),
            TaskRecord::new(TaskStatus::Failed, message),
        );
    }

    /// Returns the current record of a task, if known.
    pub async fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.tasks.read().await.get(task_id).cloned()
    }
}
