//! HTTP surface: trigger the pipeline and download the generated reports.

use crate::adapters::LocalStorage;
use crate::app::pipelines::analytics_pipeline::AnalyticsPipeline;
use crate::config::TomlConfig;
use crate::core::etl::EtlEngine;
use crate::core::Storage;
use crate::utils::error::EtlError;
use crate::utils::validation::is_plain_file_name;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::io::ReaderStream;

pub struct ApiState {
    config: TomlConfig,
    // 同一時間只允許一個 pipeline 寫入輸出目錄
    run_lock: Mutex<()>,
}

impl ApiState {
    pub fn new(config: TomlConfig) -> Self {
        Self {
            config,
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &TomlConfig {
        &self.config
    }
}

/// The application router served by `media-analytics-api`.
pub fn app(state: ApiState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/run-pipeline", post(run_pipeline))
        .route("/download-report/:filename", get(download_report))
        .with_state(Arc::new(state))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Pipeline failed: {0}")]
    PipelineFailed(EtlError),
    #[error("Report not found. Generate it first via /run-pipeline")]
    ReportNotFound,
    #[error("Invalid report filename")]
    InvalidFilename,
    #[error("Could not read report: {0}")]
    ReadFailed(EtlError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::PipelineFailed(_) | ApiError::ReadFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::ReportNotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidFilename => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorResponse {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "media-analytics".to_string(),
    })
}

async fn run_pipeline(State(state): State<Arc<ApiState>>) -> Result<Json<RunResponse>, ApiError> {
    let _guard = state.run_lock.lock().await;

    let config = state.config.clone();
    let monitor = config.monitoring_enabled();
    let data = LocalStorage::new(&config.paths.data_dir);
    let output = LocalStorage::new(&config.paths.output_dir);
    let pipeline = AnalyticsPipeline::new(data, output, config);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Pipeline run requested over HTTP finished: {}", output_path);
            Ok(Json(RunResponse {
                status: "success".to_string(),
                message: "Pipeline executed successfully".to_string(),
            }))
        }
        Err(e) => {
            tracing::error!(
                "❌ Pipeline failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            Err(ApiError::PipelineFailed(e))
        }
    }
}

async fn download_report(
    State(state): State<Arc<ApiState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    if !is_plain_file_name(&filename) {
        tracing::warn!("Rejected report download for {:?}", filename);
        return Err(ApiError::InvalidFilename);
    }

    let storage = LocalStorage::new(&state.config.paths.output_dir);
    if !storage.exists(&filename).await {
        return Err(ApiError::ReportNotFound);
    }

    let file = tokio::fs::File::open(storage.base_path().join(&filename))
        .await
        .map_err(|e| ApiError::ReadFailed(e.into()))?;
    let length = file
        .metadata()
        .await
        .map_err(|e| ApiError::ReadFailed(e.into()))?
        .len();
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|_| ApiError::InvalidFilename)?;

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(length)),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
