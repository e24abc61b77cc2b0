//! In-process task store.

use std::collections::HashMap;
use std::sync::Arc;

use lapse_models::{RenderTask, TaskId};
use tokio::sync::RwLock;

/// Shared map of every task created during the process lifetime.
///
/// The creating caller inserts a task once; afterwards only the render job
/// owning it settles it. Entries are never removed.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Arc<RwLock<HashMap<TaskId, RenderTask>>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, task: RenderTask) {
        self.tasks.write().await.insert(task.task_id.clone(), task);
    }

    /// Snapshot of a task.
    pub async fn get(&self, task_id: &TaskId) -> Option<RenderTask> {
        self.tasks.read().await.get(task_id).cloned()
    }

    /// Mark a task completed. `false` if unknown or already terminal.
    pub async fn complete(&self, task_id: &TaskId) -> bool {
        self.tasks
            .write()
            .await
            .get_mut(task_id)
            .is_some_and(RenderTask::complete)
    }

    /// Mark a task failed. `false` if unknown or already terminal.
    pub async fn fail(&self, task_id: &TaskId, error: impl Into<String>) -> bool {
        let error = error.into();
        self.tasks
            .write()
            .await
            .get_mut(task_id)
            .is_some_and(|task| task.fail(error))
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}
