//! Shutdown coordinator: `Running -> Draining -> Stopped`.
//!
//! Cancelling the token tells workers no more waiting is needed; they still
//! empty the queue before exiting. The join runs in its own task, so a caller
//! that gives up waiting does not stop the drain; `Stopped` is reached once
//! every worker task has been joined.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownState {
    Running,
    Draining,
    Stopped,
}

pub(crate) struct ShutdownCoordinator {
    token: CancellationToken,
    // Taken once, by whichever call starts the drain.
    workers: Mutex<Option<JoinSet<Result<()>>>>,
    state: Arc<watch::Sender<ShutdownState>>,
    // First worker fault, handed to the first caller that sees `Stopped`.
    fault: Arc<Mutex<Option<Error>>>,
}

impl ShutdownCoordinator {
    pub fn new(token: CancellationToken, workers: JoinSet<Result<()>>) -> Self {
        let (state, _) = watch::channel(ShutdownState::Running);
        Self {
            token,
            workers: Mutex::new(Some(workers)),
            state: Arc::new(state),
            fault: Arc::default(),
        }
    }

    pub fn state(&self) -> ShutdownState {
        *self.state.borrow()
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Signal shutdown and wait until every worker has exited.
    ///
    /// Safe to cancel and to call again: the drain keeps going in the
    /// background and a later call picks up the wait. The first call that
    /// completes returns any worker fault; the others return `Ok`.
    pub async fn shutdown(&self) -> Result<()> {
        let workers = self
            .workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        // Subscribe before spawning so `Stopped` cannot be missed.
        let mut state = self.state.subscribe();

        if let Some(workers) = workers {
            info!(workers = workers.len(), "shutdown requested, draining queue");
            self.state.send_replace(ShutdownState::Draining);
            self.token.cancel();
            tokio::spawn(join_workers(
                workers,
                Arc::clone(&self.state),
                Arc::clone(&self.fault),
            ));
        }

        // The sender lives in self, so the channel cannot close here.
        let _ = state
            .wait_for(|state| *state == ShutdownState::Stopped)
            .await;

        match self.fault.lock().unwrap_or_else(|e| e.into_inner()).take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

async fn join_workers(
    mut workers: JoinSet<Result<()>>,
    state: Arc<watch::Sender<ShutdownState>>,
    fault: Arc<Mutex<Option<Error>>>,
) {
    let mut first = None;
    while let Some(joined) = workers.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => Err(Error::Other(format!("worker task failed: {e}"))),
        };
        if let Err(e) = outcome {
            error!(error = %e, "worker ended with a fault");
            first.get_or_insert(e);
        }
    }

    *fault.lock().unwrap_or_else(|e| e.into_inner()) = first;
    state.send_replace(ShutdownState::Stopped);
    info!("all workers stopped");
}
