//! 라우트 설정 모듈.

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers::{
    download_handler, download_status_handler, health_handler, info_handler, readiness_handler,
    root_handler,
};
use crate::api::state::AppState;

/// Creates and configures all application routes.
///
/// # Routes
///
/// ## Health Check Routes
/// - `GET /health` - Liveness check
/// - `GET /ready` - Readiness check
///
/// ## Service Routes
/// - `GET /` - Service banner
/// - `POST /info` - Extract work metadata
/// - `POST /download` - Queue a background download
/// - `GET /download/status/{task_id}` - Download task status
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // Health check routes
        .route("/health", get(health_handler))
        .route("/ready", get(readiness_handler))
        // Service routes
        .route("/", get(root_handler))
        .route("/info", post(info_handler))
        .route("/download", post(download_handler))
        .route("/download/status/{task_id}", get(download_status_handler))
        // Shared state
        .with_state(state)
}
