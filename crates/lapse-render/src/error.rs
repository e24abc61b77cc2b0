//! Render error types.

use lapse_models::{ModelError, SourceId, TaskId};
use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

/// Errors returned synchronously by the orchestrator.
///
/// Failures that happen while rendering never surface here; they are
/// recorded on the task as `failed`.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Source not found: {0}")]
    SourceNotFound(SourceId),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Render service is shutting down")]
    ShuttingDown,

    #[error("Media error: {0}")]
    Media(#[from] lapse_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

impl From<ModelError> for RenderError {
    fn from(e: ModelError) -> Self {
        Self::InvalidParameter(e.to_string())
    }
}
