//! Job execution span helpers.

use tracing::Span;

use crate::model::JobId;

/// Start a span covering one job on one worker.
///
/// The `job.status` field is declared empty and filled when the job
/// reaches a terminal status.
pub fn start_job_span(worker: usize, job_id: JobId) -> Span {
    tracing::info_span!(
        "job.execute",
        "job.worker" = worker,
        "job.id" = %job_id,
        "job.status" = tracing::field::Empty,
    )
}

/// Record a status transition on the given span.
pub fn record_state_transition(span: &Span, from: &str, to: &str) {
    span.record("job.status", to);
    span.in_scope(|| {
        tracing::info!(from = from, to = to, "state_transition");
    });
}
