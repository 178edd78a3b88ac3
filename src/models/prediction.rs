use garde::Validate;
use serde::{Deserialize, Serialize};

/// One object found by an instance segmentation model.
///
/// `(x, y)` is the top-left corner of the bounding box; `mask` is the
/// run-length encoding of the object's pixels within that box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationObject {
    pub class_i: usize,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub mask: String,
}

/// Axis-aligned bounding box produced by an object detection model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Per-class probability entry in a classification prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassProb {
    pub class: String,
    pub prob: f64,
}

/// One classification prediction: the winning class plus the full
/// probability distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassPrediction {
    pub class: String,
    pub probs: Vec<ClassProb>,
}

/// A single base64-encoded image in a synchronous predict request.
#[derive(Debug, Deserialize, Validate)]
pub struct ImageContent {
    #[garde(length(min = 1))]
    pub content: String,
}

/// Body of `POST /` for classification and object detection.
#[derive(Debug, Deserialize, Validate)]
pub struct PredictRequest {
    #[garde(length(min = 1, max = 32), dive)]
    pub images: Vec<ImageContent>,
}

/// Body of `POST /jobs` for segmentation.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitJobRequest {
    #[garde(length(min = 1))]
    pub image: String,
}

/// Response to `POST /jobs`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
}

/// Response to `GET /jobs/{job_id}` once the job has completed.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobResultResponse {
    pub objects: Vec<SegmentationObject>,
}
