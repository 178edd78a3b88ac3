pub mod docs;
pub mod health;
pub mod jobs;
pub mod metrics;
pub mod predict;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::auth;
use crate::config::ModelKind;
use crate::services::codec::CodecError;
use crate::services::storage::StorageError;

/// Failure surface of the HTTP boundary. Every domain error is translated
/// into the smallest correct status code; internal detail never leaks to
/// the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The job was dead-lettered after exhausting its retries.
    #[error("Job processing failed permanently")]
    JobFailed,

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::JobFailed | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<CodecError> for ApiError {
    fn from(e: CodecError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        tracing::error!(error = %e, "Storage operation failed");
        ApiError::Internal
    }
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        ApiError::Validation(report.to_string())
    }
}

/// Assemble the route table for the configured model kind.
///
/// Synchronous kinds expose `POST /`; the segmentation kind exposes the job
/// endpoints instead. Status and docs endpoints are common to all kinds.
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(health::status))
        .route("/docs", get(docs::api_docs));

    let router = match state.config.model_kind {
        ModelKind::Classification | ModelKind::ObjectDetection => {
            router.route("/", post(predict::predict))
        }
        ModelKind::InstanceSegmentation => router
            .route("/jobs", post(jobs::submit_job))
            .route("/jobs/{job_id}", get(jobs::fetch_job)),
    };

    router
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ))
        .with_state(state)
}
