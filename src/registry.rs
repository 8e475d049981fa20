//! Job registry: the single source of truth for job status.
//!
//! Ids are dense, so statuses live in a vector indexed by sequence number.
//! Every read and write goes through one mutex; the critical sections never
//! await and never run task code.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::model::{JobId, JobStatus};

#[derive(Debug, Default)]
pub struct Registry {
    statuses: Mutex<Vec<JobStatus>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn statuses(&self) -> MutexGuard<'_, Vec<JobStatus>> {
        // No code path panics while holding the lock, so a poisoned guard
        // still holds consistent data.
        self.statuses.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Allocate the next id and record it as pending.
    pub fn allocate(&self) -> JobId {
        self.allocate_with(|_| ())
    }

    /// Allocate the next id and hand it to `enqueue` before releasing the lock.
    ///
    /// Used by submit so that queue order always matches id order.
    pub fn allocate_with<F>(&self, enqueue: F) -> JobId
    where
        F: FnOnce(JobId),
    {
        let mut statuses = self.statuses();
        let id = JobId(statuses.len() as u64);
        statuses.push(JobStatus::Pending);
        enqueue(id);
        id
    }

    /// Move a pending job to a terminal status.
    ///
    /// Fails if the id was never allocated or the job is already terminal.
    pub fn set_terminal(&self, id: JobId, to: JobStatus) -> Result<()> {
        let index = slot_index(id).ok_or_else(|| Error::NotFound(id.to_string()))?;
        let mut statuses = self.statuses();
        let slot = statuses
            .get_mut(index)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        if !slot.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                id,
                from: *slot,
                to,
            });
        }
        *slot = to;
        Ok(())
    }

    /// Current status, or `None` for an id never allocated.
    pub fn get(&self, id: JobId) -> Option<JobStatus> {
        let index = slot_index(id)?;
        self.statuses().get(index).copied()
    }

    /// Like [`Registry::get`] but takes the caller's textual id.
    pub fn lookup(&self, id: &str) -> Option<(JobId, JobStatus)> {
        let id: JobId = id.parse().ok()?;
        self.get(id).map(|status| (id, status))
    }

    /// Snapshot of every job ever allocated, in id order.
    pub fn all(&self) -> BTreeMap<JobId, JobStatus> {
        self.statuses()
            .iter()
            .enumerate()
            .map(|(seq, status)| (JobId(seq as u64), *status))
            .collect()
    }

    /// Number of jobs ever allocated.
    pub fn len(&self) -> usize {
        self.statuses().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Position of `id` in the status vector; `None` if it cannot fit a `usize`.
fn slot_index(id: JobId) -> Option<usize> {
    usize::try_from(id.seq()).ok()
}
