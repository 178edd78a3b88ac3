use std::collections::HashMap;

use image::{DynamicImage, GrayImage};

use crate::config::AppConfig;
use crate::models::prediction::{BoundingBox, SegmentationObject};
use crate::services::codec;

/// Instance segmentation adapter. The worker orchestrates storage around it;
/// the adapter itself is a pure image → objects function.
pub trait SegmentationModel: Send + Sync {
    fn classes(&self) -> &[String];

    fn predict(&self, image: &GrayImage) -> Result<Vec<SegmentationObject>, AdapterError>;
}

impl std::fmt::Debug for dyn SegmentationModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn SegmentationModel")
    }
}

/// Classification adapter: batch of images → per-image class probabilities,
/// one probability per entry of `classes()`, same order.
pub trait ClassificationModel: Send + Sync {
    fn classes(&self) -> &[String];

    fn predict(&self, images: &[DynamicImage]) -> Result<Vec<Vec<f64>>, AdapterError>;
}

/// Object detection adapter: batch of images → per-image bounding boxes.
pub trait DetectionModel: Send + Sync {
    fn predict(&self, images: &[DynamicImage]) -> Result<Vec<Vec<BoundingBox>>, AdapterError>;
}

pub type SegmentationFactory = fn(&AppConfig) -> Result<Box<dyn SegmentationModel>, AdapterError>;
pub type ClassificationFactory =
    fn(&AppConfig) -> Result<Box<dyn ClassificationModel>, AdapterError>;
pub type DetectionFactory = fn(&AppConfig) -> Result<Box<dyn DetectionModel>, AdapterError>;

/// Startup-time mapping from configured adapter names to constructors.
///
/// Deployments register their model wrappers here before starting the
/// server; resolution of an unregistered name fails explicitly unless the
/// fallback policy is enabled in configuration.
#[derive(Default)]
pub struct ModelRegistry {
    segmentation: HashMap<String, SegmentationFactory>,
    classification: HashMap<String, ClassificationFactory>,
    detection: HashMap<String, DetectionFactory>,
}

impl ModelRegistry {
    /// Registry with the deterministic default adapters pre-registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register_segmentation("threshold", |config| {
            Ok(Box::new(ThresholdSegmentationModel::new(config.class_list())))
        });
        registry.register_classification("mean_intensity", |config| {
            Ok(Box::new(MeanIntensityClassifier::new(config.class_list())))
        });
        registry.register_detection("fixed_box", |_| Ok(Box::new(FixedBoxDetector)));
        registry
    }

    pub fn register_segmentation(&mut self, name: &str, factory: SegmentationFactory) {
        self.segmentation.insert(name.to_string(), factory);
    }

    pub fn register_classification(&mut self, name: &str, factory: ClassificationFactory) {
        self.classification.insert(name.to_string(), factory);
    }

    pub fn register_detection(&mut self, name: &str, factory: DetectionFactory) {
        self.detection.insert(name.to_string(), factory);
    }

    pub fn resolve_segmentation(
        &self,
        config: &AppConfig,
    ) -> Result<Box<dyn SegmentationModel>, AdapterError> {
        match self.lookup(&self.segmentation, config)? {
            Some(factory) => factory(config),
            None => {
                tracing::warn!("No segmentation adapter configured, using fallback 'threshold'");
                Ok(Box::new(ThresholdSegmentationModel::new(config.class_list())))
            }
        }
    }

    pub fn resolve_classification(
        &self,
        config: &AppConfig,
    ) -> Result<Box<dyn ClassificationModel>, AdapterError> {
        match self.lookup(&self.classification, config)? {
            Some(factory) => factory(config),
            None => {
                tracing::warn!(
                    "No classification adapter configured, using fallback 'mean_intensity'"
                );
                Ok(Box::new(MeanIntensityClassifier::new(config.class_list())))
            }
        }
    }

    pub fn resolve_detection(
        &self,
        config: &AppConfig,
    ) -> Result<Box<dyn DetectionModel>, AdapterError> {
        match self.lookup(&self.detection, config)? {
            Some(factory) => factory(config),
            None => {
                tracing::warn!("No detection adapter configured, using fallback 'fixed_box'");
                Ok(Box::new(FixedBoxDetector))
            }
        }
    }

    /// Shared resolution policy: a registered name wins; an unknown or
    /// missing name falls back only when the config says so.
    fn lookup<'a, F>(
        &self,
        table: &'a HashMap<String, F>,
        config: &AppConfig,
    ) -> Result<Option<&'a F>, AdapterError> {
        match config.model_name.as_deref() {
            Some(name) => match table.get(name) {
                Some(factory) => Ok(Some(factory)),
                None if config.use_fallback_model => Ok(None),
                None => Err(AdapterError::NotFound(name.to_string())),
            },
            None if config.use_fallback_model => Ok(None),
            None => Err(AdapterError::NotFound("<unset>".to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("No model adapter registered under name '{0}'")]
    NotFound(String),

    #[error("Adapter construction failed: {0}")]
    Construction(String),

    #[error("Prediction failed: {0}")]
    Prediction(String),
}

/// Deterministic default segmentation adapter: pixels brighter than the
/// image mean form one foreground object.
pub struct ThresholdSegmentationModel {
    classes: Vec<String>,
}

impl ThresholdSegmentationModel {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }
}

impl SegmentationModel for ThresholdSegmentationModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict(&self, image: &GrayImage) -> Result<Vec<SegmentationObject>, AdapterError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let sum: u64 = image.pixels().map(|p| u64::from(p.0[0])).sum();
        let mean = sum / u64::from(width) / u64::from(height);

        let foreground: Vec<(u32, u32)> = image
            .enumerate_pixels()
            .filter(|(_, _, p)| u64::from(p.0[0]) > mean)
            .map(|(x, y, _)| (x, y))
            .collect();

        if foreground.is_empty() {
            return Ok(Vec::new());
        }

        let x0 = foreground.iter().map(|(x, _)| *x).min().unwrap_or(0);
        let y0 = foreground.iter().map(|(_, y)| *y).min().unwrap_or(0);
        let x1 = foreground.iter().map(|(x, _)| *x).max().unwrap_or(0);
        let y1 = foreground.iter().map(|(_, y)| *y).max().unwrap_or(0);
        let (w, h) = (x1 - x0 + 1, y1 - y0 + 1);

        let local: Vec<(u32, u32)> = foreground.iter().map(|(x, y)| (x - x0, y - y0)).collect();

        Ok(vec![SegmentationObject {
            class_i: self.classes.len().saturating_sub(1),
            x: x0,
            y: y0,
            w,
            h,
            mask: codec::rle_encode(&local, w, h),
        }])
    }
}

/// Deterministic default classifier: the positive class probability is the
/// mean pixel intensity scaled to [0, 1].
pub struct MeanIntensityClassifier {
    classes: Vec<String>,
}

impl MeanIntensityClassifier {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }
}

impl ClassificationModel for MeanIntensityClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict(&self, images: &[DynamicImage]) -> Result<Vec<Vec<f64>>, AdapterError> {
        let class_n = self.classes.len().max(1);

        Ok(images
            .iter()
            .map(|image| {
                let gray = image.to_luma8();
                let pixel_n = gray.pixels().len().max(1) as f64;
                let mean: f64 =
                    gray.pixels().map(|p| f64::from(p.0[0])).sum::<f64>() / pixel_n / 255.0;

                let mut probs = vec![(1.0 - mean) / (class_n.max(2) - 1) as f64; class_n];
                if let Some(last) = probs.last_mut() {
                    *last = mean;
                }
                probs
            })
            .collect())
    }
}

/// Deterministic default detector: one box at the origin per image, 10×10
/// clamped to the image bounds.
pub struct FixedBoxDetector;

impl DetectionModel for FixedBoxDetector {
    fn predict(&self, images: &[DynamicImage]) -> Result<Vec<Vec<BoundingBox>>, AdapterError> {
        Ok(images
            .iter()
            .map(|image| {
                vec![BoundingBox {
                    x: 0,
                    y: 0,
                    w: image.width().min(10),
                    h: image.height().min(10),
                }]
            })
            .collect())
    }
}
