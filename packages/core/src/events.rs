//! Event types for real-time updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::JobId;

/// Events emitted by the engine as jobs move through their lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    // Job events
    /// A new job was accepted.
    JobQueued {
        job_id: JobId,
        timestamp: DateTime<Utc>,
    },
    /// A worker picked the job up.
    JobStarted {
        job_id: JobId,
        worker_id: String,
        timestamp: DateTime<Utc>,
    },
    /// A job completed successfully.
    JobCompleted {
        job_id: JobId,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    /// A job failed.
    JobFailed {
        job_id: JobId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    /// Terminal jobs were dropped by the retention policy.
    JobsEvicted {
        count: usize,
        timestamp: DateTime<Utc>,
    },

    // Worker events
    /// A worker joined the pool.
    WorkerStarted {
        worker_id: String,
        timestamp: DateTime<Utc>,
    },
    /// A worker left the pool.
    WorkerStopped {
        worker_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl JobEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            JobEvent::JobQueued { timestamp, .. } => *timestamp,
            JobEvent::JobStarted { timestamp, .. } => *timestamp,
            JobEvent::JobCompleted { timestamp, .. } => *timestamp,
            JobEvent::JobFailed { timestamp, .. } => *timestamp,
            JobEvent::JobsEvicted { timestamp, .. } => *timestamp,
            JobEvent::WorkerStarted { timestamp, .. } => *timestamp,
            JobEvent::WorkerStopped { timestamp, .. } => *timestamp,
        }
    }

    /// Get the job ID associated with this event, if any.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            JobEvent::JobQueued { job_id, .. } => Some(*job_id),
            JobEvent::JobStarted { job_id, .. } => Some(*job_id),
            JobEvent::JobCompleted { job_id, .. } => Some(*job_id),
            JobEvent::JobFailed { job_id, .. } => Some(*job_id),
            _ => None,
        }
    }

    /// Whether this event marks a job reaching a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobEvent::JobCompleted { .. } | JobEvent::JobFailed { .. }
        )
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            JobEvent::JobQueued { job_id, .. } => format!("Job {} queued", job_id),
            JobEvent::JobStarted {
                job_id, worker_id, ..
            } => format!("Job {} started by {}", job_id, worker_id),
            JobEvent::JobCompleted {
                job_id,
                duration_ms,
                ..
            } => format!("Job {} completed in {}ms", job_id, duration_ms),
            JobEvent::JobFailed { job_id, reason, .. } => {
                format!("Job {} failed: {}", job_id, reason)
            }
            JobEvent::JobsEvicted { count, .. } => format!("Evicted {} finished jobs", count),
            JobEvent::WorkerStarted { worker_id, .. } => format!("Worker {} started", worker_id),
            JobEvent::WorkerStopped { worker_id, .. } => format!("Worker {} stopped", worker_id),
        }
    }
}
