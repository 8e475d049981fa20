//! # jobpool
//!
//! In-process asynchronous job engine.
//!
//! Callers submit closures and get an id back immediately. A fixed pool of
//! workers runs the jobs in submission order, persists one JSON record per
//! job, and then publishes the terminal status. Shutdown drains the queue
//! before stopping the workers.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod model;
pub mod queue;
pub mod registry;
pub mod storage;
pub mod telemetry;

pub use engine::{Engine, ShutdownState};
pub use error::{Error, Result};
pub use model::{JobId, JobRecord, JobStatus, JobStatusView, TaskError};
