//! HTTP request handler module.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::schemas::{
    DownloadQueuedResponse, InfoRequest, InfoResponse, RootResponse, TaskStatusResponse,
};
use crate::api::state::AppState;
use crate::error::{AppError, AppResult, ValidationErrorExt};

/// Service banner.
///
/// # Route
///
/// `GET /`
pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Kuaishou API Service is running!",
    })
}

/// Work metadata handler.
///
/// Resolves the link in the request body and returns the normalized work.
///
/// # Route
///
/// `POST /info`
pub async fn info_handler(
    State(state): State<AppState>,
    Json(req_body): Json<InfoRequest>,
) -> AppResult<Json<InfoResponse>> {
    req_body.validate().map_err(|e| e.to_validation_error())?;

    tracing::info!(url = %req_body.url, "Received info request");

    let schema = state
        .service
        .video_metadata(&req_body.url)
        .await
        .inspect_err(|e| tracing::warn!(url = %req_body.url, error = %e, "Info extraction failed"))?;

    Ok(Json(InfoResponse::success(schema)))
}

/// Download handler.
///
/// Registers a task and runs the download in the background.
///
/// # Route
///
/// `POST /download`
pub async fn download_handler(
    State(state): State<AppState>,
    Json(req_body): Json<InfoRequest>,
) -> AppResult<(StatusCode, Json<DownloadQueuedResponse>)> {
    req_body.validate().map_err(|e| e.to_validation_error())?;

    let task_id = Uuid::new_v4().to_string();
    let tracked = state.tasks.enqueue(&task_id).await;

    tracing::info!(task_id = %task_id, url = %req_body.url, tracked, "Download task queued");

    let background_id = task_id.clone();
    tokio::spawn(async move {
        state
            .service
            .perform_download(&req_body.url, &background_id, &state.tasks)
            .await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(DownloadQueuedResponse::queued(task_id)),
    ))
}

/// Download task status handler.
///
/// # Route
///
/// `GET /download/status/{task_id}`
pub async fn download_status_handler(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Json<TaskStatusResponse>> {
    let record = state
        .tasks
        .get(&task_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("任务 ID '{task_id}' 未找到")))?;

    Ok(Json(TaskStatusResponse::from_record(task_id, record)))
}

/// Health check response.
#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness check handler.
///
/// # Route
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness check response.
#[derive(serde::Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub cache: &'static str,
}

/// Readiness check handler.
///
/// Reports cache connectivity. Without a configured cache the service is
/// always ready.
///
/// # Route
///
/// `GET /ready`
pub async fn readiness_handler(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let cache_ok = state.service.cache_ok().await;

    let response = ReadinessResponse {
        status: if cache_ok { "ok" } else { "degraded" },
        cache: if cache_ok { "connected" } else { "disconnected" },
    };

    if cache_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
