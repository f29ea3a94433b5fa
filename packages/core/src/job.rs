//! Job identity and lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::OrderResult;

/// Unique identifier for a job, a random (v4) UUID that is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stage of a job in the state machine `QUEUED -> PROCESSING -> {COMPLETED, FAILED}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Accepted and waiting for a worker.
    Queued,
    /// Picked up by a worker.
    Processing,
    /// Processed successfully, a result is available.
    Completed,
    /// Processing raised a fault. Never has a result.
    Failed,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Check whether moving from `self` to `next` is a legal forward step.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }

    /// Get the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything known about a job at one instant.
///
/// The result lives inside the `Completed` variant, so a status of
/// `COMPLETED` and its result are always observed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Job is waiting to be processed.
    Queued { queued_at: DateTime<Utc> },
    /// Job is currently being executed by a worker.
    Processing {
        queued_at: DateTime<Utc>,
        started_at: DateTime<Utc>,
        worker_id: String,
    },
    /// Job completed successfully.
    Completed {
        queued_at: DateTime<Utc>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        result: OrderResult,
    },
    /// Job failed while processing.
    Failed {
        queued_at: DateTime<Utc>,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
        reason: String,
    },
}

impl JobState {
    /// A freshly submitted job.
    pub fn queued(queued_at: DateTime<Utc>) -> Self {
        JobState::Queued { queued_at }
    }

    /// The status label of this state.
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Queued { .. } => JobStatus::Queued,
            JobState::Processing { .. } => JobStatus::Processing,
            JobState::Completed { .. } => JobStatus::Completed,
            JobState::Failed { .. } => JobStatus::Failed,
        }
    }

    /// The result, present only once the job has completed.
    pub fn result(&self) -> Option<&OrderResult> {
        match self {
            JobState::Completed { result, .. } => Some(result),
            _ => None,
        }
    }

    /// The failure reason, present only for failed jobs.
    pub fn reason(&self) -> Option<&str> {
        match self {
            JobState::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// When the job was submitted.
    pub fn queued_at(&self) -> DateTime<Utc> {
        match self {
            JobState::Queued { queued_at }
            | JobState::Processing { queued_at, .. }
            | JobState::Completed { queued_at, .. }
            | JobState::Failed { queued_at, .. } => *queued_at,
        }
    }

    /// When the job reached its terminal state, if it has.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        match self {
            JobState::Completed { completed_at, .. } => Some(*completed_at),
            JobState::Failed { failed_at, .. } => Some(*failed_at),
            _ => None,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }
}

/// Answer to a result query.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultLookup {
    /// The job completed and this is its result.
    Ready(OrderResult),
    /// The job is known but has no result; callers branch on the status.
    NotReady(JobStatus),
    /// The identifier was never submitted (or has been evicted).
    NotFound,
}

impl ResultLookup {
    /// Build the lookup answer from an optional job state.
    pub fn from_state(state: Option<JobState>) -> Self {
        match state {
            Some(JobState::Completed { result, .. }) => ResultLookup::Ready(result),
            Some(other) => ResultLookup::NotReady(other.status()),
            None => ResultLookup::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OrderRequest;

    #[test]
    fn only_forward_transitions_are_legal() {
        use JobStatus::*;

        assert!(Queued.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));

        assert!(!Queued.can_transition_to(Completed));
        assert!(!Queued.can_transition_to(Failed));
        assert!(!Processing.can_transition_to(Queued));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Completed));
    }

    #[test]
    fn status_uses_upper_case_wire_names() {
        let json = serde_json::to_string(&JobStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
        assert_eq!(JobStatus::Queued.to_string(), "QUEUED");
    }

    #[test]
    fn job_ids_parse_back() {
        let id = JobId::new();
        let parsed = JobId::parse(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
        assert!(JobId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn result_is_only_exposed_when_completed() {
        let now = Utc::now();
        let id = JobId::new();
        let request = OrderRequest::new("cust-1", "widget", 2, 10.0);

        let failed = JobState::Failed {
            queued_at: now,
            started_at: now,
            failed_at: now,
            reason: "boom".into(),
        };
        assert!(failed.result().is_none());
        assert_eq!(failed.reason(), Some("boom"));
        assert_eq!(
            ResultLookup::from_state(Some(failed)),
            ResultLookup::NotReady(JobStatus::Failed)
        );

        let completed = JobState::Completed {
            queued_at: now,
            started_at: now,
            completed_at: now,
            result: OrderResult::priced(id, &request),
        };
        assert_eq!(completed.finished_at(), Some(now));
        assert!(matches!(
            ResultLookup::from_state(Some(completed)),
            ResultLookup::Ready(r) if r.job_id == id
        ));

        assert_eq!(ResultLookup::from_state(None), ResultLookup::NotFound);
    }
}
