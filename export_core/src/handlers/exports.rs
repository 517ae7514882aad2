//! Spreadsheet export download endpoint

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::{
    error::{AppError, Result},
    exports::{sanitize_file_name, ExportFile, SanitizeError, StoreError},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub file: Option<String>,
}

/// `GET <download route>?file=<name>`
///
/// The name is checked before the export directory is touched; only a bare
/// file name is ever joined onto it.
pub async fn download_export(
    State(state): State<AppState>,
    query: std::result::Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response> {
    let query = match query {
        Ok(Query(query)) => query,
        // A repeated or undecodable `file` parameter is refused outright
        // rather than picking one of the values.
        Err(rejection) => {
            debug!("Rejecting malformed download query: {}", rejection);
            state.metrics.record_rejected_name();
            return Err(SanitizeError::Invalid.into());
        }
    };

    let name = sanitize_file_name(query.file.as_deref()).map_err(|e| {
        if e == SanitizeError::Invalid {
            warn!(requested = ?query.file, "Rejected unsafe export name");
        }
        state.metrics.record_rejected_name();
        AppError::from(e)
    })?;

    let export = state.exports.open(&name).await.map_err(|e| {
        if matches!(e, StoreError::NotFound { .. }) {
            state.metrics.record_missing_export();
        }
        AppError::from(e)
    })?;

    let headers = download_headers(&state.content_type, &export)?;

    info!(file = %export.name, size = export.size, "Serving export");
    state.metrics.record_download(export.size);

    let body = Body::from_stream(export.into_stream(state.chunk_size));
    Ok((StatusCode::OK, headers, body).into_response())
}

fn download_headers(content_type: &HeaderValue, export: &ExportFile) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    headers.insert(header::CONTENT_TYPE, content_type.clone());
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(export.size));

    let disposition = format!(
        "attachment; filename=\"{}\"",
        export.name.replace('"', "\\\"")
    );
    let disposition = HeaderValue::from_bytes(disposition.as_bytes()).map_err(|e| {
        error!("Cannot encode Content-Disposition for {}: {}", export.path.display(), e);
        AppError::InternalServerError
    })?;
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    Ok(headers)
}
