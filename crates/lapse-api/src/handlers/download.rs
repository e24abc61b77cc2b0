//! Rendered timelapse download.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use lapse_models::{TaskId, TaskStatus};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Stream a completed render from disk.
///
/// GET /api/download/:task_id
pub async fn download_timelapse(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Response> {
    let task_id = TaskId::from_string(task_id);
    let task = state
        .orchestrator
        .get_task(&task_id)
        .await
        .map_err(|_| ApiError::not_found("File not found or not ready"))?;

    if task.status != TaskStatus::Completed {
        return Err(ApiError::not_found("File not found or not ready"));
    }

    let file = match tokio::fs::File::open(&task.output_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(task_id = %task_id, "Completed render has no artifact on disk");
            return Err(ApiError::not_found("Output file not found"));
        }
        Err(e) => return Err(e.into()),
    };
    let length = file.metadata().await?.len();

    Ok((
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"timelapse.mp4\"".to_string(),
            ),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
