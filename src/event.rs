//! Structured events emitted by the engine on every lifecycle step.
//!
//! Consumers subscribe to build dashboards or audit logs. Delivery is
//! best-effort: a lagging subscriber loses events, the engine never waits.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::JobId;

/// A structured event emitted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number. Consumers can detect gaps.
    pub seq: u64,
    /// When this event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    JobSubmitted {
        id: JobId,
    },
    JobStarted {
        id: JobId,
        worker: usize,
    },
    JobCompleted {
        id: JobId,
        duration_ms: u64,
    },
    JobFailed {
        id: JobId,
        reason: String,
        duration_ms: u64,
    },
}

impl EventKind {
    pub fn job_id(&self) -> JobId {
        match self {
            EventKind::JobSubmitted { id }
            | EventKind::JobStarted { id, .. }
            | EventKind::JobCompleted { id, .. }
            | EventKind::JobFailed { id, .. } => *id,
        }
    }
}

/// Fan-out of engine events to any number of subscribers.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    // Held across send so subscribers see sequence numbers in order.
    next_seq: Mutex<u64>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            next_seq: Mutex::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, kind: EventKind) {
        let mut next_seq = self.next_seq.lock().unwrap_or_else(|e| e.into_inner());
        let event = Event {
            seq: *next_seq,
            timestamp: Utc::now(),
            kind,
        };
        *next_seq += 1;
        let _ = self.sender.send(event);
    }
}
