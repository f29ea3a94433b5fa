//! Concurrent map from job identifier to job state.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use order_core::{JobId, JobState, JobStatus, OrderResult};

use crate::StoreError;

/// Number of stored jobs in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.queued + self.processing + self.completed + self.failed
    }
}

/// Job state keyed by identifier.
///
/// Status and result live in one record per job, so a reader never sees
/// `COMPLETED` without its result. Writes to one job never block reads of
/// another beyond the shard they share.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: DashMap<JobId, JobState>,
}

impl JobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
        }
    }

    /// Record a newly submitted job as `QUEUED`.
    pub fn insert_queued(&self, job_id: JobId, queued_at: DateTime<Utc>) -> Result<(), StoreError> {
        match self.jobs.entry(job_id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateJob(job_id)),
            Entry::Vacant(slot) => {
                slot.insert(JobState::queued(queued_at));
                Ok(())
            }
        }
    }

    /// Overwrite a job's state unconditionally, returning the previous one.
    pub fn set_state(&self, job_id: JobId, state: JobState) -> Option<JobState> {
        self.jobs.insert(job_id, state)
    }

    /// Move a job forward through its state machine.
    ///
    /// The check and the write happen under the job's entry lock, so two
    /// racing transitions cannot both succeed and a status never regresses.
    /// Returns the state that was replaced.
    pub fn transition(&self, job_id: JobId, next: JobState) -> Result<JobState, StoreError> {
        let mut entry = self
            .jobs
            .get_mut(&job_id)
            .ok_or(StoreError::UnknownJob(job_id))?;

        let from = entry.status();
        let to = next.status();
        if !from.can_transition_to(to) {
            return Err(StoreError::InvalidTransition { job_id, from, to });
        }

        Ok(std::mem::replace(entry.value_mut(), next))
    }

    /// Snapshot of a job's state.
    pub fn state(&self, job_id: &JobId) -> Option<JobState> {
        self.jobs.get(job_id).map(|entry| entry.value().clone())
    }

    /// Current status, or `None` for an unknown identifier.
    pub fn status(&self, job_id: &JobId) -> Option<JobStatus> {
        self.jobs.get(job_id).map(|entry| entry.status())
    }

    /// Result of a completed job.
    pub fn result(&self, job_id: &JobId) -> Option<OrderResult> {
        self.jobs
            .get(job_id)
            .and_then(|entry| entry.result().cloned())
    }

    pub fn contains(&self, job_id: &JobId) -> bool {
        self.jobs.contains_key(job_id)
    }

    /// Drop a job entirely.
    pub fn remove(&self, job_id: &JobId) -> Option<JobState> {
        self.jobs.remove(job_id).map(|(_, state)| state)
    }

    /// Drop a job only if it has reached a terminal state.
    pub(crate) fn remove_terminal(&self, job_id: &JobId) -> bool {
        self.jobs
            .remove_if(job_id, |_, state| state.is_terminal())
            .is_some()
    }

    /// Identifiers and finish times of all terminal jobs.
    pub(crate) fn finished_jobs(&self) -> Vec<(JobId, DateTime<Utc>)> {
        self.jobs
            .iter()
            .filter_map(|entry| entry.finished_at().map(|at| (*entry.key(), at)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Count stored jobs by status.
    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for entry in self.jobs.iter() {
            match entry.status() {
                JobStatus::Queued => counts.queued += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}
