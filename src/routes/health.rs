use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub host: String,
    #[serde(rename = "worker.pid")]
    pub worker_pid: u32,
}

/// GET / — liveness probe with host and process identity.
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        host: std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string()),
        worker_pid: std::process::id(),
    })
}
