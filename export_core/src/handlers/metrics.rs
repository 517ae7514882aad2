use axum::{extract::State, response::IntoResponse, Json};

use crate::{models::ApiResponse, AppState};

pub async fn handle_metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.metrics.get_snapshot()))
}
