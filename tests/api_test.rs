use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use media_analytics::api::{self, ApiState, ErrorResponse, HealthResponse, RunResponse};
use media_analytics::core::weekly::WEEKLY_CSV;
use media_analytics::TomlConfig;
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;

const META_CSV: &str = include_str!("fixtures/meta.csv");
const SNAPCHAT_CSV: &str = include_str!("fixtures/snapchat.csv");
const TIKTOK_CSV: &str = include_str!("fixtures/tiktok.csv");
const YOUTUBE_CSV: &str = include_str!("fixtures/youtube.csv");

fn config_for(root: &Path, seed: bool) -> TomlConfig {
    let data_dir = root.join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    if seed {
        for (name, content) in [
            ("meta.csv", META_CSV),
            ("snapchat.csv", SNAPCHAT_CSV),
            ("tiktok.csv", TIKTOK_CSV),
            ("youtube.csv", YOUTUBE_CSV),
        ] {
            std::fs::write(data_dir.join(name), content).unwrap();
        }
    }

    let mut config = TomlConfig::default();
    config.paths.data_dir = data_dir.to_str().unwrap().to_string();
    config.paths.output_dir = root.join("output").to_str().unwrap().to_string();
    config
}

async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

#[tokio::test]
async fn test_healthz() {
    let dir = TempDir::new().unwrap();
    let app = api::app(ApiState::new(config_for(dir.path(), false)));

    let (status, _, body) = send(app, "GET", "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.service, "media-analytics");
}

#[tokio::test]
async fn test_run_pipeline_then_download_report() {
    let dir = TempDir::new().unwrap();
    let app = api::app(ApiState::new(config_for(dir.path(), true)));

    let (status, _, body) = send(app.clone(), "POST", "/run-pipeline").await;
    assert_eq!(status, StatusCode::OK);
    let run: RunResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(run.status, "success");
    assert_eq!(run.message, "Pipeline executed successfully");

    let uri = format!("/download-report/{}", WEEKLY_CSV);
    let (status, headers, body) = send(app, "GET", &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"{}\"", WEEKLY_CSV).as_str()
    );

    let on_disk = std::fs::read(dir.path().join("output").join(WEEKLY_CSV)).unwrap();
    assert_eq!(
        headers[header::CONTENT_LENGTH],
        on_disk.len().to_string().as_str()
    );
    assert_eq!(body, on_disk);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_runs_do_not_interleave() {
    let dir = TempDir::new().unwrap();
    let app = api::app(ApiState::new(config_for(dir.path(), true)));

    let (first, second) = tokio::join!(
        send(app.clone(), "POST", "/run-pipeline"),
        send(app.clone(), "POST", "/run-pipeline"),
    );
    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);

    let output = dir.path().join("output");
    let weekly = std::fs::read_to_string(output.join(WEEKLY_CSV)).unwrap();
    let rows: Vec<&str> = weekly.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].starts_with("Campaign_id,"));

    let bundle = std::fs::read(output.join("media_reports.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bundle)).unwrap();
    assert_eq!(archive.len(), 8);
    let mut zipped = String::new();
    archive
        .by_name(WEEKLY_CSV)
        .unwrap()
        .read_to_string(&mut zipped)
        .unwrap();
    assert_eq!(zipped, weekly);

    let platform_data =
        std::fs::read_to_string(dir.path().join("data").join("platform_data.csv")).unwrap();
    assert_eq!(platform_data.lines().count(), 6);
}

#[tokio::test]
async fn test_run_pipeline_failure_is_500_with_detail() {
    let dir = TempDir::new().unwrap();
    let app = api::app(ApiState::new(config_for(dir.path(), false)));

    let (status, _, body) = send(app, "POST", "/run-pipeline").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        error.detail,
        "Pipeline failed: No input file for Meta (looked for meta.parquet, meta.csv)"
    );
}

#[tokio::test]
async fn test_download_before_run_is_404() {
    let dir = TempDir::new().unwrap();
    let app = api::app(ApiState::new(config_for(dir.path(), true)));

    let (status, _, body) = send(app, "GET", "/download-report/platform_impressions.html").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.detail, "Report not found. Generate it first via /run-pipeline");
}

#[tokio::test]
async fn test_download_rejects_path_traversal() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("secret.txt"), "top secret").unwrap();
    let app = api::app(ApiState::new(config_for(dir.path(), false)));

    let (status, _, body) = send(app.clone(), "GET", "/download-report/..%2Fsecret.txt").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.detail, "Invalid report filename");

    let (status, _, _) = send(app.clone(), "GET", "/download-report/..").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_rejects_names_that_break_the_header() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("output");
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(output.join("a\"b.csv"), "x").unwrap();
    let app = api::app(ApiState::new(config_for(dir.path(), false)));

    let (status, _, body) = send(app.clone(), "GET", "/download-report/a%22b.csv").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.detail, "Invalid report filename");

    let (status, _, _) = send(app, "GET", "/download-report/a%0Ab.csv").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_run_pipeline_requires_post() {
    let dir = TempDir::new().unwrap();
    let app = api::app(ApiState::new(config_for(dir.path(), true)));

    let (status, _, _) = send(app, "GET", "/run-pipeline").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_served_over_tcp() {
    let dir = TempDir::new().unwrap();
    let app = api::app(ApiState::new(config_for(dir.path(), true)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let run: RunResponse = client
        .post(format!("http://{}/run-pipeline", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(run.status, "success");

    let response = client
        .get(format!("http://{}/download-report/media_reports.zip", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let bytes = response.bytes().await.unwrap();
    let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).unwrap();
    assert_eq!(archive.len(), 8);
}
