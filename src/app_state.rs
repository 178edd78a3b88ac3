use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::queue::JobQueue;
use crate::services::registry::{ClassificationModel, DetectionModel};
use crate::services::storage::ObjectStore;

/// The resolved adapter for synchronous model kinds. Segmentation adapters
/// are owned by the worker instead and never appear here.
pub enum SyncModel {
    Classification(Box<dyn ClassificationModel>),
    Detection(Box<dyn DetectionModel>),
}

/// Shared application state passed to all route handlers and the worker.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<ObjectStore>,
    pub queue: Arc<JobQueue>,
    pub sync_model: Option<Arc<SyncModel>>,
}

impl AppState {
    pub fn new(config: AppConfig, storage: Arc<ObjectStore>, queue: Arc<JobQueue>) -> Self {
        Self {
            config: Arc::new(config),
            storage,
            queue,
            sync_model: None,
        }
    }

    pub fn with_sync_model(mut self, model: SyncModel) -> Self {
        self.sync_model = Some(Arc::new(model));
        self
    }
}
