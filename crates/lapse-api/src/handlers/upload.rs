//! Source upload handler.

use std::path::Path;

use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::Json;
use futures_util::TryStreamExt;
use lapse_models::{SourceDescriptor, SourceId, SourceKind};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_id: String,
    pub filename: String,
    pub kind: SourceKind,
}

/// Store the `file` part of a multipart form as a new source.
///
/// POST /api/upload
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            return store_field(&state, field).await.map(Json);
        }
        debug!(field = ?field.name(), "Skipping multipart field");
    }

    Err(ApiError::bad_request("Multipart field 'file' is required"))
}

async fn store_field(state: &AppState, mut field: Field<'_>) -> ApiResult<UploadResponse> {
    let filename = field
        .file_name()
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("Uploaded file has no name"))?;
    let (kind, extension) = classify(&filename)?;

    let id = SourceId::new();
    let path = state.config.upload_dir.join(format!("{}.{}", id, extension));
    tokio::fs::create_dir_all(&state.config.upload_dir).await?;

    let bytes = match write_field(&path, &mut field).await {
        Ok(0) => {
            remove_partial(&path).await;
            return Err(ApiError::bad_request("Uploaded file is empty"));
        }
        Ok(bytes) => bytes,
        Err(e) => {
            remove_partial(&path).await;
            return Err(e);
        }
    };

    let source =
        SourceDescriptor::new(id.clone(), &path, kind).with_original_filename(filename.clone());
    state.sources.insert(source).await;

    metrics::record_upload(kind.as_str(), bytes);
    info!(file_id = %id, kind = %kind, bytes, "Stored upload");

    Ok(UploadResponse {
        file_id: id.to_string(),
        filename,
        kind,
    })
}

fn classify(filename: &str) -> ApiResult<(SourceKind, String)> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .ok_or_else(|| ApiError::bad_request("File name has no extension"))?;

    let kind = SourceKind::from_extension(&extension).ok_or_else(|| {
        ApiError::bad_request(format!("Unsupported file type: .{}", extension))
    })?;
    Ok((kind, extension))
}

async fn write_field(path: &Path, field: &mut Field<'_>) -> ApiResult<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    while let Some(chunk) = field.try_next().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), "Failed to remove partial upload: {}", e);
    }
}
