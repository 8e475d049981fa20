//! Error types for jobpool.
//!
//! Task failures are not errors at this level: they travel through
//! [`crate::model::TaskOutcome`] and end up in the job's record.

use thiserror::Error;

use crate::model::{JobId, JobStatus};

#[derive(Debug, Error)]
pub enum Error {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("invalid status transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("job still running: {0}")]
    NotFinished(JobId),

    #[error("result already persisted for {0}")]
    DuplicateRecord(JobId),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("worker {worker} stopped: {message}")]
    WorkerFault { worker: usize, message: String },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
