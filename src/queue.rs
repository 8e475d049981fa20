//! Work queue: unbounded FIFO hand-off from submitters to workers.
//!
//! Push never blocks. Workers wait on a [`Notify`] raced against the
//! shutdown token instead of polling, and keep taking jobs after shutdown
//! until the queue is empty.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::model::Job;

#[derive(Debug, Default)]
pub struct WorkQueue {
    jobs: Mutex<VecDeque<Job>>,
    available: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a job and wake one waiting worker.
    pub fn push(&self, job: Job) {
        self.jobs().push_back(job);
        self.available.notify_one();
    }

    /// Take the oldest job without waiting.
    pub fn try_pop(&self) -> Option<Job> {
        self.jobs().pop_front()
    }

    /// Wait for the next job.
    ///
    /// Returns `None` only once `shutdown` is cancelled and the queue is
    /// empty; queued jobs are always handed out first.
    pub async fn pop(&self, shutdown: &CancellationToken) -> Option<Job> {
        loop {
            // Register interest before checking so a push between the check
            // and the await is not missed.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(job) = self.try_pop() {
                return Some(job);
            }
            if shutdown.is_cancelled() {
                return None;
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = shutdown.cancelled() => {}
            }
        }
    }

    /// Wait up to `timeout` for the next job; `None` means the wait elapsed.
    pub async fn pop_timeout(&self, timeout: Duration) -> Option<Job> {
        let never = CancellationToken::new();
        tokio::time::timeout(timeout, self.pop(&never))
            .await
            .ok()
            .flatten()
    }

    /// Jobs waiting to be taken. Jobs already executing are not counted.
    pub fn pending_count(&self) -> usize {
        self.jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_count() == 0
    }
}
