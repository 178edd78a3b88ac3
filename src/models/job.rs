use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue entry for one pending segmentation job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedJob {
    pub job_id: String,
    /// Number of processing attempts already made. Incremented on re-enqueue.
    pub attempt: u32,
}

impl QueuedJob {
    pub fn new(job_id: String) -> Self {
        Self { job_id, attempt: 0 }
    }

    pub fn retry(&self) -> Self {
        Self {
            job_id: self.job_id.clone(),
            attempt: self.attempt + 1,
        }
    }
}

/// Generate a fresh opaque job id: 128 random bits, lowercase hex.
pub fn new_job_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Dead-letter record stored under the `error` role when a job fails
/// permanently.
#[derive(Debug, Serialize, Deserialize)]
pub struct FailureRecord {
    pub error: String,
    pub attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_are_32_char_hex_and_unique() {
        let a = new_job_id();
        let b = new_job_id();

        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn retry_increments_attempt() {
        let job = QueuedJob::new("abc".to_string());
        let retried = job.retry().retry();

        assert_eq!(retried.job_id, "abc");
        assert_eq!(retried.attempt, 2);
    }
}
