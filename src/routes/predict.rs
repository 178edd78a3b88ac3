use axum::extract::State;
use axum::Json;
use garde::Validate;
use image::DynamicImage;
use serde_json::{json, Value};

use crate::app_state::{AppState, SyncModel};
use crate::models::prediction::{ClassPrediction, ClassProb, PredictRequest};
use crate::routes::ApiError;
use crate::services::codec;

/// POST / — synchronous prediction for classification and object detection
/// deployments. The batch is decoded, passed to the adapter, and the result
/// is returned in the same request.
pub async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<Value>, ApiError> {
    req.validate()?;

    let images = req
        .images
        .iter()
        .map(|doc| codec::decode_base64_image(&doc.content))
        .collect::<Result<Vec<DynamicImage>, _>>()?;

    let model = state.sync_model.as_ref().ok_or_else(|| {
        tracing::error!("Predict route hit without a resolved sync model");
        ApiError::Internal
    })?;

    match model.as_ref() {
        SyncModel::Classification(model) => {
            let batch = model.predict(&images).map_err(|e| {
                tracing::error!(error = %e, "Classification adapter failed");
                ApiError::Internal
            })?;
            let predictions: Vec<ClassPrediction> = batch
                .iter()
                .map(|probs| to_class_prediction(probs, model.classes()))
                .collect();
            Ok(Json(json!({ "predictions": predictions })))
        }
        SyncModel::Detection(model) => {
            let batch = model.predict(&images).map_err(|e| {
                tracing::error!(error = %e, "Detection adapter failed");
                ApiError::Internal
            })?;
            Ok(Json(json!({ "predictions": batch })))
        }
    }
}

fn to_class_prediction(probs: &[f64], classes: &[String]) -> ClassPrediction {
    let winner = probs
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0);

    ClassPrediction {
        class: classes.get(winner).cloned().unwrap_or_default(),
        probs: classes
            .iter()
            .zip(probs)
            .map(|(class, prob)| ClassProb {
                class: class.clone(),
                prob: (prob * 100_000.0).round() / 100_000.0,
            })
            .collect(),
    }
}
