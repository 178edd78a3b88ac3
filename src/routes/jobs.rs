use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::job::{new_job_id, QueuedJob};
use crate::models::prediction::{
    JobResultResponse, SegmentationObject, SubmitJobRequest, SubmitJobResponse,
};
use crate::routes::ApiError;
use crate::services::codec;
use crate::services::storage::ObjectRole;

/// POST /jobs — accept a segmentation job.
///
/// The image is decoded up front so malformed uploads fail here with a 400
/// instead of inside the worker. On success the input is stored, the id is
/// enqueued, and the client polls `GET /jobs/{job_id}` for the result.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(req): Json<SubmitJobRequest>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiError> {
    req.validate()?;

    let image = codec::decode_base64_image(&req.image)?;
    let payload = codec::encode_png(&image).map_err(|e| {
        tracing::error!(error = %e, "Failed to re-encode validated image");
        ApiError::Internal
    })?;

    let job_id = new_job_id();
    state
        .storage
        .save(&job_id, ObjectRole::Input, &payload)
        .await?;
    state.queue.enqueue(QueuedJob::new(job_id.clone()));

    metrics::counter!("modelbox_jobs_submitted").increment(1);
    tracing::info!(job_id = %job_id, "Job submitted");

    Ok((StatusCode::CREATED, Json(SubmitJobResponse { job_id })))
}

/// GET /jobs/{job_id} — fetch a completed job's result.
///
/// Pending and unknown ids are indistinguishable: both are 404. A job that
/// exhausted its retries surfaces as a 500 so clients can stop polling.
pub async fn fetch_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobResultResponse>, ApiError> {
    // Ids are always lowercase hex; anything else can't name a stored job
    // and must not reach the filesystem layer.
    if !is_well_formed_id(&job_id) {
        return Err(ApiError::NotFound("No job result found".to_string()));
    }

    match state.storage.load(&job_id, ObjectRole::Output).await? {
        Some(payload) => {
            let objects: Vec<SegmentationObject> =
                serde_json::from_slice(&payload).map_err(|e| {
                    tracing::error!(job_id = %job_id, error = %e, "Stored result is unreadable");
                    ApiError::Internal
                })?;
            Ok(Json(JobResultResponse { objects }))
        }
        None => {
            if state
                .storage
                .load(&job_id, ObjectRole::Error)
                .await?
                .is_some()
            {
                Err(ApiError::JobFailed)
            } else {
                Err(ApiError::NotFound("No job result found".to_string()))
            }
        }
    }
}

fn is_well_formed_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 64 && id.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_well_formedness() {
        assert!(is_well_formed_id("0123456789abcdef0123456789abcdef"));
        assert!(!is_well_formed_id(""));
        assert!(!is_well_formed_id("../../etc/passwd"));
        assert!(!is_well_formed_id("abc-output"));
    }
}
