//! Service info and health checks

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::{info, warn};

use crate::{models::ApiResponse, AppState};

pub async fn handle_root(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(serde_json::json!({
        "app": state.app_name,
        "version": state.version,
        "endpoints": {
            "download": format!("{}?file={{name}}", state.download_route),
            "health": "/health",
            "ready": "/ready",
            "metrics": "/metrics"
        }
    })))
}

pub async fn handle_liveness(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(serde_json::json!({
        "status": "alive",
        "version": state.version,
        "timestamp": chrono::Utc::now().timestamp()
    })))
}

/// Ready once the export directory is present and readable as a directory.
pub async fn handle_readiness(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /ready - Readiness check");

    match state.exports.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "status": "ready",
                "timestamp": chrono::Utc::now().timestamp()
            }))),
        ),
        Err(e) => {
            warn!("Export directory unavailable: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::error(
                    "Service not ready: export_directory_unavailable".to_string(),
                )),
            )
        }
    }
}
