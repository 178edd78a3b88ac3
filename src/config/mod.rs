use serde::Deserialize;
use strum::{Display, EnumString};

/// Which model wrapper kind this deployment serves. One kind per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelKind {
    Classification,
    ObjectDetection,
    InstanceSegmentation,
}

/// Dequeue ordering of the job queue. The protocol only promises eventual
/// pickup, so the order is a deployment knob rather than a contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueueOrder {
    #[default]
    Fifo,
    Lifo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:9876").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Model wrapper kind served by this process.
    pub model_kind: ModelKind,

    /// Registry name of the model adapter to construct at startup.
    pub model_name: Option<String>,

    /// Substitute the deterministic default adapter when `model_name` is
    /// missing or unregistered. Without this, resolution failure is fatal.
    #[serde(default)]
    pub use_fallback_model: bool,

    /// Bearer API key. Auth is disabled when unset.
    pub api_key: Option<String>,

    /// Directory backing the object store.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,

    /// Comma-separated class labels exposed by the model.
    #[serde(default = "default_classes")]
    pub classes: String,

    /// Job queue dequeue ordering.
    #[serde(default)]
    pub queue_order: QueueOrder,

    /// Worker sleep between empty queue polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Processing attempts per job before it is dead-lettered.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Service name shown in the docs document.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Service description shown in the docs document.
    #[serde(default = "default_service_desc")]
    pub service_desc: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:9876".to_string()
}

fn default_storage_path() -> String {
    "./data/storage".to_string()
}

fn default_classes() -> String {
    "bg,fg".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_service_name() -> String {
    "modelbox".to_string()
}

fn default_service_desc() -> String {
    "HTTP serving shell for pluggable ML model wrappers".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Class labels as a list, in configured order.
    pub fn class_list(&self) -> Vec<String> {
        self.classes
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }
}
