//! Retention policy for finished jobs.

use std::time::Duration;

use chrono::{DateTime, Utc};
use order_core::{EngineConfig, JobId};

use crate::JobStore;

/// Rules for dropping terminal jobs from the store.
///
/// Queued and processing jobs are never dropped. An evicted identifier
/// answers not-found afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Drop terminal jobs that finished longer ago than this.
    pub max_age: Option<Duration>,
    /// Keep at most this many terminal jobs, dropping the oldest first.
    pub max_finished: Option<usize>,
}

impl RetentionPolicy {
    /// Build the policy described by an engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_age: config.retention(),
            max_finished: config.max_retained_jobs,
        }
    }

    /// Whether this policy ever drops anything.
    pub fn is_enabled(&self) -> bool {
        self.max_age.is_some() || self.max_finished.is_some()
    }

    /// Apply the policy at `now`, returning the evicted identifiers.
    pub fn apply(&self, store: &JobStore, now: DateTime<Utc>) -> Vec<JobId> {
        let mut evicted = Vec::new();

        if let Some(max_age) = self.max_age {
            // Durations beyond chrono's range mean nothing is old enough.
            if let Ok(age) = chrono::Duration::from_std(max_age)
                && let Some(cutoff) = now.checked_sub_signed(age)
            {
                evicted.extend(store.evict_finished_before(cutoff));
            }
        }

        if let Some(max_finished) = self.max_finished {
            evicted.extend(store.evict_excess_finished(max_finished));
        }

        if !evicted.is_empty() {
            tracing::debug!("Retention evicted {} finished jobs", evicted.len());
        }
        evicted
    }
}

impl JobStore {
    /// Drop terminal jobs that finished before `cutoff`.
    pub fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> Vec<JobId> {
        self.finished_jobs()
            .into_iter()
            .filter(|(_, finished_at)| *finished_at < cutoff)
            .filter_map(|(job_id, _)| self.remove_terminal(&job_id).then_some(job_id))
            .collect()
    }

    /// Drop the oldest terminal jobs until at most `max` remain.
    pub fn evict_excess_finished(&self, max: usize) -> Vec<JobId> {
        let mut finished = self.finished_jobs();
        if finished.len() <= max {
            return Vec::new();
        }

        finished.sort_by_key(|(_, finished_at)| *finished_at);
        let excess = finished.len() - max;
        finished
            .into_iter()
            .take(excess)
            .filter_map(|(job_id, _)| self.remove_terminal(&job_id).then_some(job_id))
            .collect()
    }
}
