use std::collections::VecDeque;
use std::sync::Mutex;

use crate::config::QueueOrder;
use crate::models::job::QueuedJob;

/// In-process handoff queue between the submission handlers and the worker.
///
/// Handlers append concurrently from request tasks; the single worker pops.
/// A mutex-guarded deque is sufficient since both operations are O(1) and
/// touch opposite ends under FIFO ordering.
pub struct JobQueue {
    inner: Mutex<VecDeque<QueuedJob>>,
    order: QueueOrder,
}

impl JobQueue {
    pub fn new(order: QueueOrder) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            order,
        }
    }

    /// Append a job. Never blocks beyond the mutex.
    pub fn enqueue(&self, job: QueuedJob) {
        let mut queue = self.inner.lock().expect("job queue lock poisoned");
        queue.push_back(job);
        metrics::gauge!("modelbox_queue_depth").set(queue.len() as f64);
    }

    /// Remove and return the next job, or `None` when the queue is empty.
    pub fn dequeue(&self) -> Option<QueuedJob> {
        let mut queue = self.inner.lock().expect("job queue lock poisoned");
        let job = match self.order {
            QueueOrder::Fifo => queue.pop_front(),
            QueueOrder::Lifo => queue.pop_back(),
        };
        metrics::gauge!("modelbox_queue_depth").set(queue.len() as f64);
        job
    }

    /// Current number of pending jobs.
    pub fn depth(&self) -> usize {
        self.inner.lock().expect("job queue lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str) -> QueuedJob {
        QueuedJob {
            job_id: id.to_string(),
            attempt: 0,
        }
    }

    #[test]
    fn fifo_preserves_submission_order() {
        let queue = JobQueue::new(QueueOrder::Fifo);
        queue.enqueue(job("a"));
        queue.enqueue(job("b"));
        queue.enqueue(job("c"));

        assert_eq!(queue.dequeue().unwrap().job_id, "a");
        assert_eq!(queue.dequeue().unwrap().job_id, "b");
        assert_eq!(queue.dequeue().unwrap().job_id, "c");
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn lifo_pops_newest_first() {
        let queue = JobQueue::new(QueueOrder::Lifo);
        queue.enqueue(job("a"));
        queue.enqueue(job("b"));

        assert_eq!(queue.dequeue().unwrap().job_id, "b");
        assert_eq!(queue.dequeue().unwrap().job_id, "a");
    }

    #[test]
    fn depth_tracks_contents() {
        let queue = JobQueue::new(QueueOrder::Fifo);
        assert_eq!(queue.depth(), 0);

        queue.enqueue(job("a"));
        queue.enqueue(job("b"));
        assert_eq!(queue.depth(), 2);

        queue.dequeue();
        assert_eq!(queue.depth(), 1);
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        use std::sync::Arc;

        let queue = Arc::new(JobQueue::new(QueueOrder::Fifo));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        queue.enqueue(QueuedJob {
                            job_id: format!("{}-{}", i, j),
                            attempt: 0,
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.depth(), 400);
    }
}
