use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::config::ModelKind;

/// GET /docs — static API description derived from configuration.
pub async fn api_docs(State(state): State<AppState>) -> Json<Value> {
    let mut endpoints = vec![
        json!({
            "path": "/",
            "method": "GET",
            "name": "Status endpoint",
            "description": "Returns status of the API",
        }),
        json!({
            "path": "/docs",
            "method": "GET",
            "name": "Documentation endpoint",
            "description": "Returns this information",
        }),
    ];
    endpoints.extend(kind_endpoints(&state));

    Json(json!({
        "name": state.config.service_name,
        "description": state.config.service_desc,
        "authentication": {
            "header": "Authorization",
            "schema": "Bearer <API_KEY>",
        },
        "endpoints": endpoints,
    }))
}

fn kind_endpoints(state: &AppState) -> Vec<Value> {
    let classes = state.config.class_list();
    let input_image_format = json!({
        "type": "png",
        "palette": "RGB24 or GRAY8",
        "encoding": "base64",
    });

    match state.config.model_kind {
        ModelKind::Classification => vec![json!({
            "path": "/",
            "method": "POST",
            "name": "Predict endpoint",
            "request_body": { "images": [{ "content": "<str>" }] },
            "image_content_format": input_image_format,
            "response_body": {
                "predictions": [{ "class": "<str>", "probs": [{ "class": "<str>", "prob": "<float>" }] }],
            },
            "classes": classes,
        })],
        ModelKind::ObjectDetection => vec![json!({
            "path": "/",
            "method": "POST",
            "name": "Predict endpoint",
            "request_body": { "images": [{ "content": "<str>" }] },
            "image_content_format": input_image_format,
            "response_body": {
                "predictions": [[{ "x": "<int>", "y": "<int>", "w": "<int>", "h": "<int>" }]],
            },
            "classes": classes,
        })],
        ModelKind::InstanceSegmentation => vec![
            json!({
                "path": "/jobs",
                "method": "POST",
                "name": "Job submission endpoint",
                "request_body": { "image": "<str>" },
                "image_format": input_image_format,
                "response_body": { "job_id": "<hex str>" },
            }),
            json!({
                "path": "/jobs/<job_id>",
                "method": "GET",
                "name": "Job result endpoint",
                "response_body": {
                    "objects": [{
                        "class_i": "<int>",
                        "x": "<int>",
                        "y": "<int>",
                        "w": "<int>",
                        "h": "<int>",
                        "mask": "<str>",
                    }],
                },
                "object_mask_format": {
                    "type": "rle",
                    "encoding": "plain",
                },
                "classes": classes,
            }),
        ],
    }
}
