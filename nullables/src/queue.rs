//! Nullable queue — record published jobs without a queue service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use stakequiz_queue::{DeadLetter, JobPublisher, QueueError, RetryPolicy, VerificationJob};

/// A [`JobPublisher`] that records publishes instead of sending them.
#[derive(Default)]
pub struct NullQueue {
    published: Mutex<Vec<VerificationJob>>,
    dead: Mutex<Vec<DeadLetter>>,
    fail_publishes: AtomicBool,
}

impl NullQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// All jobs published so far, in order.
    pub fn published(&self) -> Vec<VerificationJob> {
        self.published.lock().unwrap().clone()
    }

    /// Pre-load the dead-letter list.
    pub fn add_dead_letter(&self, letter: DeadLetter) {
        self.dead.lock().unwrap().push(letter);
    }

    /// Make subsequent publishes fail as if the queue were down.
    pub fn set_fail_publishes(&self, fail: bool) {
        self.fail_publishes.store(fail, Ordering::SeqCst);
    }
}

impl JobPublisher for NullQueue {
    async fn publish(
        &self,
        job: &VerificationJob,
        _policy: RetryPolicy,
    ) -> Result<(), QueueError> {
        if self.fail_publishes.load(Ordering::SeqCst) {
            return Err(QueueError::Rejected {
                status: 503,
                body: "queue unavailable".into(),
            });
        }
        self.published.lock().unwrap().push(job.clone());
        Ok(())
    }

    async fn dead_letters(&self) -> Result<Vec<DeadLetter>, QueueError> {
        Ok(self.dead.lock().unwrap().clone())
    }
}
