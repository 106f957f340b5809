//! FIFO queue of pending upload jobs.

use std::collections::VecDeque;

use super::UploadJob;

/// Ordered sequence of jobs not yet reached by the worker.
///
/// Only the worker pops; cancel-by-id only flags entries.
#[derive(Debug, Default)]
pub struct QueueStore {
    jobs: VecDeque<UploadJob>,
}

impl QueueStore {
    pub fn new(jobs: Vec<UploadJob>) -> Self {
        Self { jobs: jobs.into() }
    }

    /// Take the next job in submission order.
    pub fn pop_next(&mut self) -> Option<UploadJob> {
        self.jobs.pop_front()
    }

    /// Flag a queued job as cancelled. Returns false if the id is not queued.
    pub fn cancel(&mut self, job_id: &str) -> bool {
        match self.jobs.iter_mut().find(|job| job.id == job_id) {
            Some(job) => {
                job.cancelled = true;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::UploadRequest;

    fn job(id: &str) -> UploadJob {
        UploadJob::from_request(id, UploadRequest::new(format!("/v/{id}.mp4"), id), 10)
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = QueueStore::new(vec![job("a"), job("b"), job("c")]);
        assert_eq!(queue.pop_next().unwrap().id, "a");
        assert_eq!(queue.pop_next().unwrap().id, "b");
        assert_eq!(queue.pop_next().unwrap().id, "c");
        assert!(queue.pop_next().is_none());
        assert!(QueueStore::default().pop_next().is_none());
    }

    #[test]
    fn test_cancel_flags_queued_job() {
        let mut queue = QueueStore::new(vec![job("a"), job("b")]);
        assert!(queue.cancel("b"));
        assert!(!queue.cancel("missing"));

        let a = queue.pop_next().unwrap();
        assert!(!a.cancelled);
        let b = queue.pop_next().unwrap();
        assert!(b.cancelled);
    }

    #[test]
    fn test_cancel_after_pop_has_no_effect() {
        let mut queue = QueueStore::new(vec![job("a")]);
        let current = queue.pop_next().unwrap();
        assert!(!queue.cancel(&current.id));
    }
}
