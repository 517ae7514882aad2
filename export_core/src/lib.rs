//! Core library for the export download server: configuration, the export
//! store and the HTTP surface around it.

pub mod config;
pub mod error;
pub mod exports;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use exports::{ExportFile, ExportStore, SPREADSHEET_CONTENT_TYPE};
pub use handlers::routes::create_routes;
pub use metrics::MetricsCollector;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{HeaderValue, Request},
    middleware::{self as axum_middleware, Next},
    response::Response,
    Router,
};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub exports: ExportStore,
    pub content_type: HeaderValue,
    pub chunk_size: usize,
    pub download_route: String,
    pub metrics: MetricsCollector,
}

impl AppState {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_name: "Export Download Server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            exports: ExportStore::new(export_dir),
            content_type: HeaderValue::from_static(SPREADSHEET_CONTENT_TYPE),
            chunk_size: exports::DEFAULT_CHUNK_SIZE,
            download_route: exports::DEFAULT_DOWNLOAD_ROUTE.to_string(),
            metrics: MetricsCollector::new(),
        }
    }

    /// Builds state from an already validated configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let content_type: mime::Mime = config.exports.content_type.parse().map_err(|_| {
            AppError::Config(format!(
                "Invalid export content type: {}",
                config.exports.content_type
            ))
        })?;

        Ok(Self::new(config.export_dir()?)
            .with_content_type(content_type)
            .with_chunk_size(config.exports.chunk_size)
            .with_download_route(&config.exports.route))
    }

    pub fn with_content_type(mut self, content_type: mime::Mime) -> Self {
        // Mime only holds visible ASCII, so this always succeeds.
        if let Ok(value) = HeaderValue::from_str(content_type.as_ref()) {
            self.content_type = value;
        }
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_download_route(mut self, route: &str) -> Self {
        self.download_route = route.to_string();
        self
    }
}

pub fn create_app(state: AppState) -> Router {
    create_app_with_config(state, &AppConfig::default())
}

pub fn create_app_with_config(state: AppState, config: &AppConfig) -> Router {
    let mut router = create_routes(&state.download_route);

    router = router.route_layer(axum_middleware::from_fn_with_state(
        state.clone(),
        metrics_middleware,
    ));

    router = router.layer(TimeoutLayer::new(Duration::from_secs(
        config.server.request_timeout_seconds,
    )));

    router = router.layer(middleware::cors::cors_layer_from_config(&config.cors));

    router = router.layer(axum_middleware::from_fn_with_state(
        config.logging.clone(),
        middleware::logging::log_request,
    ));

    router = middleware::logging::with_request_tracing(router);

    router.with_state(state)
}

async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let start = std::time::Instant::now();

    state.metrics.record_request(&endpoint);

    let response = next.run(request).await;

    state
        .metrics
        .record_response(start.elapsed().as_millis(), response.status().as_u16());

    response
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
