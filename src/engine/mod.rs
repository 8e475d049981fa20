//! Core engine. The public API for submitting jobs and polling them.
//!
//! The engine owns the registry, the work queue, the result store, and the
//! worker pool. Routing layers hold an `Engine` (or an `Arc` of one) and
//! never reach into the parts directly.

mod shutdown;
mod worker;

pub use shutdown::ShutdownState;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::event::{Event, EventBus, EventKind};
use crate::model::{Job, JobId, JobRecord, JobStatus, JobStatusView, Task, into_task};
use crate::queue::WorkQueue;
use crate::registry::Registry;
use crate::storage::ResultStore;
use crate::telemetry::metrics;

use shutdown::ShutdownCoordinator;
use worker::Worker;

/// The job engine. Owns all state and enforces all invariants.
///
/// Dropping an engine without calling [`Engine::shutdown`] aborts its
/// workers. Queued jobs are then lost, and a task already running on the
/// blocking pool finishes with its result discarded: no record is written
/// and its status stays `running`. Once shutdown has started, the drain
/// continues even if the engine is dropped.
pub struct Engine {
    registry: Arc<Registry>,
    queue: Arc<WorkQueue>,
    store: ResultStore,
    events: Arc<EventBus>,
    coordinator: ShutdownCoordinator,
    num_workers: usize,
}

impl Engine {
    /// Open the result store and spawn the worker pool.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn start(config: PoolConfig) -> Result<Self> {
        let store = ResultStore::open(&config.results_dir).await?;
        let registry = Arc::new(Registry::new());
        let queue = Arc::new(WorkQueue::new());
        let events = Arc::new(EventBus::new(config.event_capacity));
        let num_workers = config.num_workers.max(1);

        let token = CancellationToken::new();
        let mut workers = JoinSet::new();
        for index in 0..num_workers {
            let worker = Worker {
                index,
                registry: Arc::clone(&registry),
                queue: Arc::clone(&queue),
                store: store.clone(),
                events: Arc::clone(&events),
            };
            workers.spawn(worker.run(token.clone()));
        }

        info!(
            workers = num_workers,
            results_dir = %store.dir().display(),
            "job engine started"
        );

        Ok(Self {
            registry,
            queue,
            store,
            events,
            coordinator: ShutdownCoordinator::new(token, workers),
            num_workers,
        })
    }

    /// Submit a job. Returns its id immediately; the task runs later on a
    /// worker.
    ///
    /// The closure's error becomes the job's failure reason; its value must
    /// serialize to a JSON document.
    pub fn submit<F, T, E>(&self, f: F) -> JobId
    where
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        T: Serialize,
        E: fmt::Display,
    {
        self.submit_task(into_task(f))
    }

    /// Submit an already type-erased task.
    pub fn submit_task(&self, task: Task) -> JobId {
        if self.coordinator.is_requested() {
            // Accepting or refusing is the caller's policy; warn so a job
            // submitted after the drain is not silently stranded.
            warn!("job submitted after shutdown was requested");
        }

        let id = self
            .registry
            .allocate_with(|id| self.queue.push(Job::new(id, task)));

        metrics::jobs_submitted().add(1, &[]);
        self.events.emit(EventKind::JobSubmitted { id });
        debug!(job_id = %id, pending = self.queue.pending_count(), "job submitted");
        id
    }

    /// Caller-visible status: `unknown`, `running`, `done` or `error`.
    pub fn status(&self, id: &str) -> JobStatusView {
        match self.registry.lookup(id) {
            Some((_, status)) => status.into(),
            None => JobStatusView::Unknown,
        }
    }

    /// The persisted record of a finished job.
    ///
    /// Fails with `NotFound` for unknown ids and `NotFinished` while the job
    /// is still running.
    pub async fn fetch_result(&self, id: &str) -> Result<JobRecord> {
        let (id, status) = self
            .registry
            .lookup(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        if status == JobStatus::Pending {
            return Err(Error::NotFinished(id));
        }
        self.store.read(id).await
    }

    /// Jobs queued and not yet picked up by a worker.
    pub fn pending_jobs_count(&self) -> usize {
        self.queue.pending_count()
    }

    /// Status of every job ever submitted, in id order.
    pub fn all_statuses(&self) -> BTreeMap<JobId, JobStatusView> {
        self.registry
            .all()
            .into_iter()
            .map(|(id, status)| (id, status.into()))
            .collect()
    }

    /// Drain the queue, then stop every worker. Idempotent.
    pub async fn shutdown(&self) -> Result<()> {
        self.coordinator.shutdown().await
    }

    /// True once shutdown has been requested, while draining and after.
    pub fn is_shutting_down(&self) -> bool {
        self.coordinator.is_requested()
    }

    pub fn shutdown_state(&self) -> ShutdownState {
        self.coordinator.state()
    }

    /// Subscribe to lifecycle events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }
}
