use std::sync::Arc;

use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::watch;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use modelbox::app_state::{AppState, SyncModel};
use modelbox::config::{AppConfig, ModelKind};
use modelbox::routes;
use modelbox::services::queue::JobQueue;
use modelbox::services::registry::ModelRegistry;
use modelbox::services::storage::ObjectStore;
use modelbox::services::worker::Worker;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!(model_kind = %config.model_kind, "Initializing modelbox server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("modelbox_jobs_submitted", "Total segmentation jobs submitted");
    metrics::describe_counter!("modelbox_jobs_completed", "Total segmentation jobs completed");
    metrics::describe_counter!(
        "modelbox_jobs_failed",
        "Total segmentation jobs dead-lettered after exhausting retries"
    );
    metrics::describe_gauge!("modelbox_queue_depth", "Current number of pending jobs");
    metrics::describe_histogram!(
        "modelbox_job_processing_seconds",
        "Time the worker spent processing one job"
    );

    // Initialize the object store
    tracing::info!(path = %config.storage_path, "Opening object store");
    let storage = Arc::new(
        ObjectStore::open(&config.storage_path)
            .await
            .expect("Failed to open object store"),
    );

    // Initialize the in-process job queue
    let queue = Arc::new(JobQueue::new(config.queue_order));

    // Resolve the configured model adapter. Deployments that ship their own
    // wrappers register them here before resolution.
    let registry = ModelRegistry::with_defaults();

    let state = AppState::new(config.clone(), storage, queue);

    // For the async kind the adapter is owned by the background worker; for
    // sync kinds it lives in the shared state next to the handlers.
    let (state, segmentation_model) = match config.model_kind {
        ModelKind::InstanceSegmentation => {
            let model = registry
                .resolve_segmentation(&config)
                .expect("Failed to resolve segmentation adapter");
            (state, Some(model))
        }
        ModelKind::Classification => {
            let model = registry
                .resolve_classification(&config)
                .expect("Failed to resolve classification adapter");
            (state.with_sync_model(SyncModel::Classification(model)), None)
        }
        ModelKind::ObjectDetection => {
            let model = registry
                .resolve_detection(&config)
                .expect("Failed to resolve detection adapter");
            (state.with_sync_model(SyncModel::Detection(model)), None)
        }
    };

    // Start the single background worker with a shutdown handle
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = segmentation_model.map(|model| {
        tracing::info!("Starting background worker");
        tokio::spawn(Worker::new(state.clone(), model, shutdown_rx).run())
    });

    // Build API routes
    let app = routes::build_router(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024)); // 10 MB limit

    tracing::info!("Starting modelbox on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Stop the worker cleanly before exiting
    shutdown_tx.send(true).ok();
    if let Some(handle) = worker_handle {
        handle.await.ok();
    }

    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl-c");
    tracing::info!("Shutdown signal received");
}
