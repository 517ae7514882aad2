//! Route table

use axum::{routing::get, Router};

use super::{exports, health, metrics};
use crate::AppState;

/// `download_route` must already be validated: axum panics on malformed or
/// overlapping paths.
pub fn create_routes(download_route: &str) -> Router<AppState> {
    Router::new()
        .route("/", get(health::handle_root))
        .route("/health", get(health::handle_liveness))
        .route("/ready", get(health::handle_readiness))
        .route("/metrics", get(metrics::handle_metrics))
        .route(download_route, get(exports::download_export))
}
