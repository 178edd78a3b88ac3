use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::sleep;

use crate::app_state::AppState;
use crate::models::job::{FailureRecord, QueuedJob};
use crate::models::prediction::SegmentationObject;
use crate::services::registry::{AdapterError, SegmentationModel};
use crate::services::storage::{ObjectRole, StorageError};

/// The single background consumer of the job queue.
///
/// Exactly one worker runs per deployment. It owns the segmentation adapter
/// and is the sole writer of `output` and `error` entries in the store.
pub struct Worker {
    state: AppState,
    model: Box<dyn SegmentationModel>,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    pub fn new(
        state: AppState,
        model: Box<dyn SegmentationModel>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            state,
            model,
            shutdown,
        }
    }

    /// Main processing loop. Returns once the shutdown signal fires.
    pub async fn run(mut self) {
        tracing::info!(classes = ?self.model.classes(), "Worker started");
        let poll_interval = Duration::from_millis(self.state.config.poll_interval_ms);

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            match self.process_next().await {
                Ok(true) => {
                    // Job handled, check for the next one immediately.
                    continue;
                }
                Ok(false) => {
                    tracing::trace!("No jobs available, sleeping");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Worker iteration failed");
                }
            }

            tokio::select! {
                _ = sleep(poll_interval) => {}
                _ = self.shutdown.changed() => {}
            }
        }

        tracing::info!("Worker stopped");
    }

    /// Handle the next queued job, if any.
    ///
    /// Returns `Ok(true)` when a job was dequeued (whether it succeeded,
    /// was re-queued, or was dead-lettered), `Ok(false)` on an empty queue.
    pub async fn process_next(&self) -> Result<bool, WorkerError> {
        let Some(job) = self.state.queue.dequeue() else {
            return Ok(false);
        };

        tracing::info!(job_id = %job.job_id, attempt = job.attempt, "Processing job");
        let start = Instant::now();

        match self.process_job(&job).await {
            Ok(objects) => {
                let payload = serde_json::to_vec(&objects)?;
                self.state
                    .storage
                    .save(&job.job_id, ObjectRole::Output, &payload)
                    .await?;

                metrics::counter!("modelbox_jobs_completed").increment(1);
                metrics::histogram!("modelbox_job_processing_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::info!(
                    job_id = %job.job_id,
                    objects = objects.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Job completed"
                );
                Ok(true)
            }
            Err(e) => {
                tracing::error!(job_id = %job.job_id, error = %e, "Job processing failed");
                self.handle_failure(&job, &e).await?;
                Ok(true)
            }
        }
    }

    /// Load input, run the adapter, return the predicted objects.
    async fn process_job(&self, job: &QueuedJob) -> Result<Vec<SegmentationObject>, WorkerError> {
        let input = self
            .state
            .storage
            .load(&job.job_id, ObjectRole::Input)
            .await?
            .ok_or_else(|| WorkerError::MissingInput(job.job_id.clone()))?;

        let image = image::load_from_memory(&input)
            .map_err(|e| WorkerError::CorruptInput(e.to_string()))?
            .to_luma8();

        Ok(self.model.predict(&image)?)
    }

    /// Re-queue a failed job, or dead-letter it once retries are exhausted.
    async fn handle_failure(&self, job: &QueuedJob, error: &WorkerError) -> Result<(), WorkerError> {
        let attempts = job.attempt + 1;

        if attempts >= self.state.config.max_retries {
            let record = FailureRecord {
                error: error.to_string(),
                attempts,
            };
            self.state
                .storage
                .save(
                    &job.job_id,
                    ObjectRole::Error,
                    &serde_json::to_vec(&record)?,
                )
                .await?;

            metrics::counter!("modelbox_jobs_failed").increment(1);
            tracing::warn!(job_id = %job.job_id, attempts, "Job dead-lettered");
        } else {
            self.state.queue.enqueue(job.retry());
            tracing::info!(job_id = %job.job_id, attempts, "Job re-queued for retry");
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("No input payload stored for job {0}")]
    MissingInput(String),

    #[error("Stored input is not a decodable image: {0}")]
    CorruptInput(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("Result serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, ModelKind, QueueOrder};
    use crate::models::job::new_job_id;
    use crate::services::codec::encode_png;
    use crate::services::queue::JobQueue;
    use crate::services::registry::ModelRegistry;
    use crate::services::storage::ObjectStore;
    use image::{DynamicImage, GrayImage};
    use std::sync::Arc;

    fn test_config(storage_path: &str) -> AppConfig {
        AppConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            model_kind: ModelKind::InstanceSegmentation,
            model_name: None,
            use_fallback_model: true,
            api_key: None,
            storage_path: storage_path.to_string(),
            classes: "bg,fg".to_string(),
            queue_order: QueueOrder::Fifo,
            poll_interval_ms: 10,
            max_retries: 3,
            service_name: "modelbox".to_string(),
            service_desc: "test".to_string(),
        }
    }

    async fn test_worker(dir: &tempfile::TempDir) -> (AppState, Worker) {
        let config = test_config(dir.path().to_str().unwrap());
        let storage = Arc::new(ObjectStore::open(dir.path()).await.unwrap());
        let queue = Arc::new(JobQueue::new(QueueOrder::Fifo));
        let state = AppState::new(config.clone(), storage, queue);

        let model = ModelRegistry::with_defaults()
            .resolve_segmentation(&config)
            .unwrap();
        let (_tx, rx) = watch::channel(false);
        let worker = Worker::new(state.clone(), model, rx);
        (state, worker)
    }

    fn test_image_png() -> Vec<u8> {
        let image = GrayImage::from_raw(2, 2, vec![0, 0, 255, 255]).unwrap();
        encode_png(&DynamicImage::ImageLuma8(image)).unwrap()
    }

    #[tokio::test]
    async fn empty_queue_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (_state, worker) = test_worker(&dir).await;

        assert!(!worker.process_next().await.unwrap());
    }

    #[tokio::test]
    async fn successful_job_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let (state, worker) = test_worker(&dir).await;

        let job_id = new_job_id();
        state
            .storage
            .save(&job_id, ObjectRole::Input, &test_image_png())
            .await
            .unwrap();
        state.queue.enqueue(QueuedJob::new(job_id.clone()));

        assert!(worker.process_next().await.unwrap());

        let output = state
            .storage
            .load(&job_id, ObjectRole::Output)
            .await
            .unwrap()
            .expect("output should be stored");
        let objects: Vec<SegmentationObject> = serde_json::from_slice(&output).unwrap();
        assert!(!objects.is_empty());
        assert_eq!(state.queue.depth(), 0);
    }

    #[tokio::test]
    async fn corrupt_input_is_retried_then_dead_lettered() {
        let dir = tempfile::tempdir().unwrap();
        let (state, worker) = test_worker(&dir).await;

        let job_id = new_job_id();
        state
            .storage
            .save(&job_id, ObjectRole::Input, b"not a png")
            .await
            .unwrap();
        state.queue.enqueue(QueuedJob::new(job_id.clone()));

        // max_retries = 3: two re-queues, then the dead-letter write.
        for _ in 0..3 {
            assert!(worker.process_next().await.unwrap());
        }

        assert_eq!(state.queue.depth(), 0);
        assert!(state
            .storage
            .load(&job_id, ObjectRole::Output)
            .await
            .unwrap()
            .is_none());

        let record = state
            .storage
            .load(&job_id, ObjectRole::Error)
            .await
            .unwrap()
            .expect("dead-letter record should be stored");
        let record: FailureRecord = serde_json::from_slice(&record).unwrap();
        assert_eq!(record.attempts, 3);
    }
}
