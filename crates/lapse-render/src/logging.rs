//! Structured task logging utilities.

use lapse_models::{RenderVariant, TaskId};
use tracing::{error, info, warn, Span};

/// Task logger for render lifecycle events.
///
/// Every event carries the task id and the render variant so a single
/// render can be followed through the logs.
#[derive(Debug, Clone)]
pub struct TaskLogger {
    task_id: String,
    variant: &'static str,
}

impl TaskLogger {
    pub fn new(task_id: &TaskId, variant: RenderVariant) -> Self {
        Self {
            task_id: task_id.to_string(),
            variant: variant.as_str(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(task_id = %self.task_id, variant = self.variant, "Render started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(task_id = %self.task_id, variant = self.variant, "Render progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(task_id = %self.task_id, variant = self.variant, "Render warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(task_id = %self.task_id, variant = self.variant, "Render failed: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(task_id = %self.task_id, variant = self.variant, "Render completed: {}", message);
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn variant(&self) -> &'static str {
        self.variant
    }

    /// Span covering one render.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("render_task", task_id = %self.task_id, variant = self.variant)
    }
}
