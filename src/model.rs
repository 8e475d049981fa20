//! Core data model.
//!
//! A job is an opaque unit of work: a closure producing a JSON document or
//! failing with a reason. The engine assigns its identity, tracks its
//! status, and persists its outcome exactly once.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Job identity
// ---------------------------------------------------------------------------

const JOB_ID_PREFIX: &str = "job_id_";

/// Sequential job identifier, rendered as `job_id_<n>`.
///
/// Ids are handed out by the registry in submission order starting at 0
/// and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct JobId(pub u64);

impl JobId {
    /// Position of this job in submission order.
    pub fn seq(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{JOB_ID_PREFIX}{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Only the canonical rendering names a job: no signs, no leading zeros.
        s.strip_prefix(JOB_ID_PREFIX)
            .and_then(|n| n.parse::<u64>().ok())
            .map(JobId)
            .filter(|id| id.to_string() == s)
            .ok_or_else(|| crate::error::Error::NotFound(s.to_string()))
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for JobId {
    type Error = crate::error::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Registry-side lifecycle status of a job.
///
/// Queued and executing jobs are both `Pending`; there is no separate
/// "started" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, not yet finished.
    Pending,
    /// Finished successfully. Terminal.
    Done,
    /// Task failed. Terminal.
    Error,
}

impl JobStatus {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: JobStatus) -> bool {
        use JobStatus::*;
        matches!((self, to), (Pending, Done) | (Pending, Error))
    }

    /// Is this a terminal state?
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Status as reported to pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatusView {
    /// The id was never allocated.
    Unknown,
    Running,
    Done,
    Error,
}

impl JobStatusView {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatusView::Done | JobStatusView::Error)
    }
}

impl From<JobStatus> for JobStatusView {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => JobStatusView::Running,
            JobStatus::Done => JobStatusView::Done,
            JobStatus::Error => JobStatusView::Error,
        }
    }
}

impl fmt::Display for JobStatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatusView::Unknown => "unknown",
            JobStatusView::Running => "running",
            JobStatusView::Done => "done",
            JobStatusView::Error => "error",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Why a task failed. Becomes the `reason` of the job's error record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskError(String);

impl TaskError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    pub fn reason(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for TaskError {}

impl From<String> for TaskError {
    fn from(reason: String) -> Self {
        Self(reason)
    }
}

impl From<&str> for TaskError {
    fn from(reason: &str) -> Self {
        Self(reason.to_string())
    }
}

/// What a task produced.
pub type TaskOutcome = Result<serde_json::Value, TaskError>;

/// A type-erased task body, run once on a worker.
pub type Task = Box<dyn FnOnce() -> TaskOutcome + Send + 'static>;

/// Erase a caller's closure into a [`Task`].
///
/// The closure's error is rendered with `Display`; a value that cannot be
/// turned into a JSON document fails the task instead of the worker.
pub fn into_task<F, T, E>(f: F) -> Task
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Serialize,
    E: fmt::Display,
{
    Box::new(move || {
        let value = f().map_err(|e| TaskError::new(e.to_string()))?;
        serde_json::to_value(value)
            .map_err(|e| TaskError::new(format!("result is not a JSON document: {e}")))
    })
}

/// A queued job: identity plus the work to run.
pub struct Job {
    pub id: JobId,
    pub task: Task,
}

impl Job {
    pub fn new(id: JobId, task: Task) -> Self {
        Self { id, task }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("id", &self.id).finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Persisted record
// ---------------------------------------------------------------------------

/// The persisted outcome of a job, one per id.
///
/// Serializes as `{"status": "done", "data": ...}` or
/// `{"status": "error", "reason": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobRecord {
    Done { data: serde_json::Value },
    Error { reason: String },
}

impl JobRecord {
    /// The terminal status this record publishes.
    pub fn status(&self) -> JobStatus {
        match self {
            JobRecord::Done { .. } => JobStatus::Done,
            JobRecord::Error { .. } => JobStatus::Error,
        }
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            JobRecord::Done { data } => Some(data),
            JobRecord::Error { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            JobRecord::Done { .. } => None,
            JobRecord::Error { reason } => Some(reason),
        }
    }
}

impl From<TaskOutcome> for JobRecord {
    fn from(outcome: TaskOutcome) -> Self {
        match outcome {
            Ok(data) => JobRecord::Done { data },
            Err(e) => JobRecord::Error {
                reason: e.reason().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn job_id_parses_its_own_rendering() {
        let id = JobId(17);
        assert_eq!(id.to_string(), "job_id_17");
        assert_eq!("job_id_17".parse::<JobId>().unwrap(), id);
    }

    #[test]
    fn job_id_rejects_foreign_strings() {
        assert!("job_17".parse::<JobId>().is_err());
        assert!("job_id_".parse::<JobId>().is_err());
        assert!("job_id_-1".parse::<JobId>().is_err());
        assert!("job_id_007".parse::<JobId>().is_err());
    }

    #[test]
    fn only_pending_moves_and_only_to_terminal() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Done));
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Error));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Done.can_transition_to(JobStatus::Error));
        assert!(!JobStatus::Error.can_transition_to(JobStatus::Done));
    }

    #[test]
    fn record_uses_status_tag() {
        let done = JobRecord::Done {
            data: json!({"value": 42}),
        };
        assert_eq!(
            serde_json::to_value(&done).unwrap(),
            json!({"status": "done", "data": {"value": 42}})
        );

        let failed = JobRecord::Error {
            reason: "division by zero".into(),
        };
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"status": "error", "reason": "division by zero"})
        );
    }

    #[test]
    fn into_task_reports_closure_error_text() {
        let task = into_task(|| -> Result<i32, String> { Err("division by zero".into()) });
        assert_eq!(task().unwrap_err().reason(), "division by zero");
    }

    #[test]
    fn into_task_rejects_non_document_values() {
        use std::collections::HashMap;
        // Non-string map keys cannot become a JSON object.
        let task = into_task(|| -> Result<HashMap<(u8, u8), u8>, String> {
            Ok(HashMap::from([((1, 2), 3)]))
        });
        let err = task().unwrap_err();
        assert!(err.reason().starts_with("result is not a JSON document"));
    }
}
