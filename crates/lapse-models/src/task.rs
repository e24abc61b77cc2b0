//! Render task definitions and lifecycle.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::{AspectRatio, OutputDuration, SourceId};

/// Unique, unguessable identifier for a render task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a new random task ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Transcoder is running (or waiting for a worker slot)
    #[default]
    Processing,
    /// Output artifact is ready
    Completed,
    /// Render failed; no artifact
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which kind of input the task renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RenderVariant {
    /// One or more recorded videos, subsampled to fit the target duration
    Video,
    /// A sequence of stills, one output frame each
    Photos,
}

impl RenderVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderVariant::Video => "video",
            RenderVariant::Photos => "photos",
        }
    }
}

/// Snapshot of a render task.
///
/// Created in `Processing` with progress 0 and settled exactly once by the
/// worker that owns it. Progress is binary: 0 until completed, then 100.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RenderTask {
    pub task_id: TaskId,
    pub source_ids: Vec<SourceId>,
    pub variant: RenderVariant,
    /// Duration the caller asked for
    pub requested_seconds: OutputDuration,
    /// Achievable duration when the source material was insufficient
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_output_seconds: Option<u32>,
    pub aspect_ratio: AspectRatio,
    pub status: TaskStatus,
    pub progress: u8,
    pub output_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RenderTask {
    /// Create a new task in the processing state.
    pub fn new(
        task_id: TaskId,
        source_ids: Vec<SourceId>,
        variant: RenderVariant,
        requested_seconds: OutputDuration,
        aspect_ratio: AspectRatio,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            task_id,
            source_ids,
            variant,
            requested_seconds,
            actual_output_seconds: None,
            aspect_ratio,
            status: TaskStatus::Processing,
            progress: 0,
            output_path: output_path.into(),
            error_message: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Record the duration the render will actually produce.
    pub fn with_actual_output_seconds(mut self, seconds: Option<u32>) -> Self {
        self.actual_output_seconds = seconds;
        self
    }

    /// Advertised output duration: the actual value when it overrides the request.
    pub fn output_seconds(&self) -> u32 {
        self.actual_output_seconds
            .unwrap_or_else(|| self.requested_seconds.seconds())
    }

    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Mark the task completed. Returns `false` if it had already settled.
    pub fn complete(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Completed;
        self.progress = 100;
        self.finished_at = Some(Utc::now());
        true
    }

    /// Mark the task failed. Returns `false` if it had already settled.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Failed;
        self.progress = 0;
        self.error_message = Some(error.into());
        self.finished_at = Some(Utc::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_task() -> RenderTask {
        RenderTask::new(
            TaskId::new(),
            vec![SourceId::from_string("src-1")],
            RenderVariant::Video,
            OutputDuration::new(30).unwrap(),
            AspectRatio::Portrait,
            "/tmp/out.mp4",
        )
    }

    #[test]
    fn test_new_task_is_processing() {
        let task = new_task();
        assert_eq!(task.status, TaskStatus::Processing);
        assert_eq!(task.progress, 0);
        assert!(!task.is_terminal());
        assert!(task.finished_at.is_none());
    }

    #[test]
    fn test_complete_sets_progress() {
        let mut task = new_task();
        assert!(task.complete());
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 100);
        assert!(task.finished_at.is_some());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut task = new_task();
        assert!(task.fail("ffmpeg exited with 1"));
        assert!(!task.complete());
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.progress, 0);

        let mut task = new_task();
        assert!(task.complete());
        assert!(!task.fail("late failure"));
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.error_message.is_none());
    }

    #[test]
    fn test_actual_seconds_override() {
        let task = new_task();
        assert_eq!(task.output_seconds(), 30);

        let task = new_task().with_actual_output_seconds(Some(3));
        assert_eq!(task.output_seconds(), 3);
    }

    #[test]
    fn test_task_ids_are_unique() {
        assert_ne!(TaskId::new(), TaskId::new());
    }
}
