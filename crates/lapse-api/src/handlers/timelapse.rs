//! Timelapse task handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use lapse_models::{
    AspectRatio, OutputDuration, RecordingHint, RenderTask, SourceId, TaskId, TaskStatus,
};
use lapse_render::CreateTaskRequest;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body of `POST /api/timelapse`.
///
/// `sourceIds` takes precedence; `fileId` is the single-upload shorthand
/// older clients send.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TimelapseRequest {
    #[validate(length(min = 1, max = 50))]
    pub source_ids: Option<Vec<String>>,
    pub file_id: Option<String>,
    pub output_seconds: i64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub recording_seconds: f64,
    pub aspect_ratio: Option<String>,
}

/// Body of `POST /api/timelapse/photos`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PhotoTimelapseRequest {
    #[validate(length(min = 1, max = 10000))]
    pub source_ids: Vec<String>,
    pub output_seconds: i64,
    pub aspect_ratio: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelapseCreateResponse {
    pub task_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelapseStatusResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl From<&RenderTask> for TimelapseStatusResponse {
    fn from(task: &RenderTask) -> Self {
        let download_url = (task.status == TaskStatus::Completed)
            .then(|| format!("/api/download/{}", task.task_id));
        Self {
            task_id: task.task_id.to_string(),
            status: task.status,
            progress: task.progress,
            output_seconds: Some(task.output_seconds()),
            download_url,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelapseCancelResponse {
    pub task_id: String,
    pub cancelled: bool,
}

/// Start a video timelapse render.
///
/// POST /api/timelapse
pub async fn create_timelapse(
    State(state): State<AppState>,
    body: Result<Json<TimelapseRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TimelapseCreateResponse>)> {
    let Json(request) = body?;
    request.validate()?;

    // Both enumerated domains are checked before any task exists
    let output = OutputDuration::new(request.output_seconds)?;
    let aspect_ratio = parse_aspect_ratio(request.aspect_ratio.as_deref())?;

    if !state.config.allow_zero_recording_hint && request.recording_seconds <= 0.0 {
        return Err(ApiError::bad_request("recordingSeconds must be positive"));
    }

    let source_ids = match (request.source_ids, request.file_id) {
        (Some(ids), _) => ids,
        (None, Some(file_id)) => vec![file_id],
        (None, None) => return Err(ApiError::bad_request("sourceIds or fileId is required")),
    };

    let task_id = state
        .orchestrator
        .create_task(CreateTaskRequest {
            source_ids: source_ids.into_iter().map(SourceId::from_string).collect(),
            output,
            aspect_ratio,
            recording_hint: RecordingHint::from_seconds(request.recording_seconds),
        })
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(TimelapseCreateResponse {
            task_id: task_id.to_string(),
        }),
    ))
}

/// Start a photo-sequence timelapse render.
///
/// POST /api/timelapse/photos
pub async fn create_photo_timelapse(
    State(state): State<AppState>,
    body: Result<Json<PhotoTimelapseRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TimelapseCreateResponse>)> {
    let Json(request) = body?;
    request.validate()?;

    let output = OutputDuration::new(request.output_seconds)?;
    let aspect_ratio = parse_aspect_ratio(request.aspect_ratio.as_deref())?;

    let task_id = state
        .orchestrator
        .create_task_from_photos(
            request.source_ids.into_iter().map(SourceId::from_string).collect(),
            output,
            aspect_ratio,
        )
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(TimelapseCreateResponse {
            task_id: task_id.to_string(),
        }),
    ))
}

/// Poll a render.
///
/// GET /api/timelapse/:task_id
pub async fn get_timelapse_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<TimelapseStatusResponse>> {
    let task = state.orchestrator.get_task(&TaskId::from_string(task_id)).await?;
    Ok(Json(TimelapseStatusResponse::from(&task)))
}

/// Cancel a render that has not settled yet.
///
/// DELETE /api/timelapse/:task_id
pub async fn cancel_timelapse(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<(StatusCode, Json<TimelapseCancelResponse>)> {
    let task_id = TaskId::from_string(task_id);
    let cancelled = state.orchestrator.cancel_task(&task_id).await?;
    let status = if cancelled {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(TimelapseCancelResponse {
            task_id: task_id.to_string(),
            cancelled,
        }),
    ))
}

/// Omitted ratios use the default; anything else must be supported.
fn parse_aspect_ratio(tag: Option<&str>) -> ApiResult<AspectRatio> {
    match tag {
        Some(tag) => Ok(tag.parse()?),
        None => Ok(AspectRatio::default()),
    }
}
