use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use export_core::{
    create_app, create_app_with_config, AppConfig, AppState, SPREADSHEET_CONTENT_TYPE,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestSystem {
    root: TempDir,
    state: AppState,
    app: Router,
}

impl TestSystem {
    fn exports_dir(&self) -> std::path::PathBuf {
        self.root.path().join("exports")
    }
}

/// Export directory nested one level below a temp root so traversal targets
/// can be planted next to it.
fn setup_test_system() -> TestSystem {
    let root = TempDir::new().unwrap();
    let exports_dir = root.path().join("exports");
    std::fs::create_dir(&exports_dir).unwrap();
    std::fs::write(root.path().join("secret.txt"), b"top secret").unwrap();

    let state = AppState::new(&exports_dir);
    let app = create_app(state.clone());

    TestSystem { root, state, app }
}

async fn send(app: &Router, method: Method, uri: &str) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_report_download() {
    let system = setup_test_system();
    std::fs::write(system.exports_dir().join("report.xlsx"), vec![0x50u8; 1024]).unwrap();

    let response = send(&system.app, Method::GET, "/api/exports/download?file=report.xlsx").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "1024");
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        SPREADSHEET_CONTENT_TYPE
    );
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("report.xlsx"));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.len(), 1024);
}

#[tokio::test]
async fn test_traversal_never_reaches_sibling_file() {
    let system = setup_test_system();

    for uri in [
        "/api/exports/download?file=../secret.txt",
        "/api/exports/download?file=../../secret.txt",
        "/api/exports/download?file=..%2Fsecret.txt",
    ] {
        let response = send(&system.app, Method::GET, uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body = body_text(response).await;
        assert_eq!(body, "Invalid filename");
        assert!(!body.contains("top secret"));
    }

    let absolute = format!(
        "/api/exports/download?file={}",
        system.root.path().join("secret.txt").display()
    );
    let response = send(&system.app, Method::GET, &absolute).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_parameter_and_missing_file() {
    let system = setup_test_system();

    let response = send(&system.app, Method::GET, "/api/exports/download").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Filename is required");

    let response = send(&system.app, Method::GET, "/api/exports/download?file=absent.xlsx").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_text(response).await;
    assert_eq!(body, "File not found");
    assert!(!body.contains(system.exports_dir().to_str().unwrap()));
}

#[cfg(unix)]
#[tokio::test]
async fn test_io_failure_is_opaque_500() {
    let system = setup_test_system();
    let path = system.exports_dir().join("loop.xlsx");
    std::os::unix::fs::symlink(&path, &path).unwrap();

    let response = send(&system.app, Method::GET, "/api/exports/download?file=loop.xlsx").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_text(response).await;
    assert_eq!(body, "Internal Server Error");
    assert!(!body.contains(system.exports_dir().to_str().unwrap()));
}

#[tokio::test]
async fn test_head_request_reports_size() {
    let system = setup_test_system();
    std::fs::write(system.exports_dir().join("inventory.xlsx"), vec![1u8; 300]).unwrap();

    let response = send(
        &system.app,
        Method::HEAD,
        "/api/exports/download?file=inventory.xlsx",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "300");
}

#[tokio::test]
async fn test_file_written_after_startup_is_served() {
    let system = setup_test_system();

    let response = send(&system.app, Method::GET, "/api/exports/download?file=late.xlsx").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    std::fs::write(system.exports_dir().join("late.xlsx"), b"fresh export").unwrap();

    let response = send(&system.app, Method::GET, "/api/exports/download?file=late.xlsx").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "fresh export");
}

#[tokio::test]
async fn test_configured_route_and_content_type() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("costs.csv"), b"sku,cost\n").unwrap();

    let mut config = AppConfig::default();
    config.exports.dir = root.path().to_path_buf();
    config.exports.route = "/files/export".to_string();
    config.exports.content_type = "text/csv".to_string();
    config.exports.chunk_size = 4;
    assert!(config.validate().is_ok());

    let state = AppState::from_config(&config).unwrap();
    let app = create_app_with_config(state, &config);

    let response = send(&app, Method::GET, "/files/export?file=costs.csv").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/csv");
    assert_eq!(body_text(response).await, "sku,cost\n");

    let response = send(&app, Method::GET, "/api/exports/download?file=costs.csv").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_readiness() {
    let system = setup_test_system();

    let response = send(&system.app, Method::GET, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "alive");

    let response = send(&system.app, Method::GET, "/ready").await;
    assert_eq!(response.status(), StatusCode::OK);

    std::fs::remove_dir_all(system.exports_dir()).unwrap();
    let response = send(&system.app, Method::GET, "/ready").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_root_lists_download_route() {
    let system = setup_test_system();

    let response = send(&system.app, Method::GET, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["data"]["endpoints"]["download"],
        "/api/exports/download?file={name}"
    );
}

#[tokio::test]
async fn test_metrics_reflect_downloads() {
    let system = setup_test_system();
    std::fs::write(system.exports_dir().join("a.xlsx"), vec![0u8; 10]).unwrap();

    send(&system.app, Method::GET, "/api/exports/download?file=a.xlsx").await;
    send(&system.app, Method::GET, "/api/exports/download?file=../a.xlsx").await;
    send(&system.app, Method::GET, "/api/exports/download?file=b.xlsx").await;

    let snapshot = system.state.metrics.get_snapshot();
    assert_eq!(snapshot.downloads_served, 1);
    assert_eq!(snapshot.bytes_served, 10);
    assert_eq!(snapshot.rejected_names, 1);
    assert_eq!(snapshot.missing_exports, 1);
    assert_eq!(snapshot.failed_requests, 2);

    let response = send(&system.app, Method::GET, "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["downloads_served"], 1);
    let endpoints = json["data"]["requests_by_endpoint"].as_array().unwrap();
    assert!(endpoints
        .iter()
        .any(|e| e["endpoint"] == "/api/exports/download" && e["count"] == 3));
}

#[tokio::test]
async fn test_cors_exposes_download_headers() {
    let system = setup_test_system();
    std::fs::write(system.exports_dir().join("ui.xlsx"), b"x").unwrap();

    let request = Request::builder()
        .uri("/api/exports/download?file=ui.xlsx")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = system.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
}
