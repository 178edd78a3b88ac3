use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::app_state::AppState;

/// Bearer-token gate for all model endpoints.
///
/// A no-op when no API key is configured. Otherwise every request must carry
/// `Authorization: Bearer <key>` with the configured key.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let Some(expected) = state.config.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(key) if key == expected => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!("Request with invalid API key rejected");
            Err(unauthorized("The provided API key is not valid"))
        }
        None => Err(unauthorized("Please provide an API key as part of the request")),
    }
}

fn unauthorized(description: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [("WWW-Authenticate", "Bearer realm='Access to protected endpoint'")],
        Json(serde_json::json!({ "error": description })),
    )
        .into_response()
}
