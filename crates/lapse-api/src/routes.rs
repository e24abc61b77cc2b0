//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    cancel_timelapse, create_photo_timelapse, create_timelapse, download_timelapse,
    get_timelapse_status, health, ready, upload_file,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, propagate_request_id_layer, request_logging, set_request_id_layer,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let api_routes = Router::new()
        .route("/upload", post(upload_file))
        .route("/timelapse", post(create_timelapse))
        .route("/timelapse/photos", post(create_photo_timelapse))
        .route(
            "/timelapse/:task_id",
            get(get_timelapse_status).delete(cancel_timelapse),
        )
        .route("/download/:task_id", get(download_timelapse));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Uploads stream to disk, so the configured limit replaces axum's 2 MB default
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging))
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
