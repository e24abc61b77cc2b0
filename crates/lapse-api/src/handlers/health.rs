//! Liveness and readiness probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Outcome of one readiness check.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Check {
    Ok,
    Error { error: String },
}

impl Check {
    fn from_result<T, E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(_) => Check::Ok,
            Err(e) => Check::Error {
                error: e.to_string(),
            },
        }
    }

    fn is_ok(&self) -> bool {
        matches!(self, Check::Ok)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessChecks {
    pub ffmpeg: Check,
    pub ffprobe: Check,
    pub accepting_tasks: Check,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

/// GET /ready
///
/// Ready when both media binaries resolve and the render pool still admits
/// work; 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let accepting_tasks = if state.orchestrator.is_shutting_down() {
        Check::Error {
            error: "shutting down".to_string(),
        }
    } else {
        Check::Ok
    };

    let checks = ReadinessChecks {
        ffmpeg: Check::from_result(lapse_media::check_ffmpeg()),
        ffprobe: Check::from_result(lapse_media::check_ffprobe()),
        accepting_tasks,
    };

    let ready = checks.ffmpeg.is_ok() && checks.ffprobe.is_ok() && checks.accepting_tasks.is_ok();
    let (code, status) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (code, Json(ReadinessResponse { status, checks }))
}
