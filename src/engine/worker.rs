//! Worker loop: take a job, run it, persist its record, publish its status.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

use crate::error::{Error, Result};
use crate::event::{EventBus, EventKind};
use crate::model::{Job, JobRecord, JobStatus, Task, TaskError, TaskOutcome};
use crate::queue::WorkQueue;
use crate::registry::Registry;
use crate::storage::ResultStore;
use crate::telemetry::job::{record_state_transition, start_job_span};
use crate::telemetry::metrics;

/// Everything one worker loop needs. Cheap to build, one per loop.
pub(crate) struct Worker {
    pub index: usize,
    pub registry: Arc<Registry>,
    pub queue: Arc<WorkQueue>,
    pub store: ResultStore,
    pub events: Arc<EventBus>,
}

impl Worker {
    /// Run until `shutdown` is cancelled and the queue is empty.
    ///
    /// Task failures never end the loop. A persistence failure does: the
    /// job's status cannot be published without its record.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        debug!(worker = self.index, "worker started");

        while let Some(job) = self.queue.pop(&shutdown).await {
            if let Err(e) = self.process(job).await {
                error!(worker = self.index, error = %e, "worker stopping on fault");
                metrics::worker_faults().add(1, &[]);
                return Err(Error::WorkerFault {
                    worker: self.index,
                    message: e.to_string(),
                });
            }
        }

        debug!(worker = self.index, "queue drained, worker exiting");
        Ok(())
    }

    async fn process(&self, job: Job) -> Result<()> {
        let Job { id, task } = job;
        let span = start_job_span(self.index, id);

        async {
            self.events.emit(EventKind::JobStarted {
                id,
                worker: self.index,
            });

            let started = Instant::now();
            let outcome = execute(task).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let record = JobRecord::from(outcome);
            let status = record.status();

            // Record first, then status: a poller that sees a terminal
            // status can always read the record.
            self.store.write(id, &record).await?;
            self.registry.set_terminal(id, status)?;
            record_state_transition(&span, &JobStatus::Pending.to_string(), &status.to_string());

            let labels = [KeyValue::new("status", status.to_string())];
            metrics::jobs_completed().add(1, &labels);
            metrics::job_duration_ms().record(duration_ms as f64, &labels);

            match record {
                JobRecord::Done { .. } => {
                    info!(job_id = %id, duration_ms, "job done");
                    self.events.emit(EventKind::JobCompleted { id, duration_ms });
                }
                JobRecord::Error { reason } => {
                    warn!(job_id = %id, duration_ms, %reason, "job failed");
                    self.events.emit(EventKind::JobFailed {
                        id,
                        reason,
                        duration_ms,
                    });
                }
            }

            Ok(())
        }
        .instrument(span.clone())
        .await
    }
}

/// Run a task on the blocking pool, folding panics into task failures.
pub(crate) async fn execute(task: Task) -> TaskOutcome {
    match tokio::task::spawn_blocking(task).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => Err(TaskError::new(format!(
            "task panicked: {}",
            panic_message(e.into_panic().as_ref())
        ))),
        Err(e) => Err(TaskError::new(format!("task aborted: {e}"))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn execute_passes_through_success() {
        let task: Task = Box::new(|| Ok(json!({"value": 42})));
        let outcome = execute(task).await;
        assert_eq!(outcome.unwrap(), json!({"value": 42}));
    }

    #[tokio::test]
    async fn execute_contains_panics() {
        let task: Task = Box::new(|| panic!("boom"));
        let outcome = execute(task).await;
        assert_eq!(outcome.unwrap_err().reason(), "task panicked: boom");
    }

    #[tokio::test]
    async fn execute_contains_formatted_panics() {
        let code = 7;
        let task: Task = Box::new(move || panic!("exit code {code}"));
        let outcome = execute(task).await;
        assert_eq!(outcome.unwrap_err().reason(), "task panicked: exit code 7");
    }
}
