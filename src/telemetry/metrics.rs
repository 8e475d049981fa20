//! Metric instrument factories for jobpool.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an exporter the global provider is a no-op, so callers record
//! unconditionally.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("jobpool")
}

/// Counter: number of jobs accepted by submit.
pub fn jobs_submitted() -> Counter<u64> {
    meter()
        .u64_counter("jobpool.jobs.submitted")
        .with_description("Number of jobs submitted")
        .build()
}

/// Counter: jobs that reached a terminal status.
/// Labels: `status` ("done" | "error").
pub fn jobs_completed() -> Counter<u64> {
    meter()
        .u64_counter("jobpool.jobs.completed")
        .with_description("Number of jobs that reached a terminal status")
        .build()
}

/// Histogram: task execution time in milliseconds.
/// Labels: `status`.
pub fn job_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("jobpool.job.duration_ms")
        .with_description("Task execution time in milliseconds")
        .with_unit("ms")
        .build()
}

/// Counter: worker loops stopped by a persistence failure.
pub fn worker_faults() -> Counter<u64> {
    meter()
        .u64_counter("jobpool.worker.faults")
        .with_description("Worker loops stopped by a persistence failure")
        .build()
}
