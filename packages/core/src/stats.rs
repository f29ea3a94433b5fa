//! Engine statistics.

use serde::{Deserialize, Serialize};

/// Statistics for the engine's current state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineStats {
    /// Jobs waiting for a worker.
    pub queued: u64,
    /// Jobs currently held by a worker.
    pub processing: u64,
    /// Jobs completed since start.
    pub completed: u64,
    /// Jobs failed since start.
    pub failed: u64,
    /// Number of workers in the pool.
    pub workers: u32,
    /// Average processing duration in milliseconds.
    pub avg_duration_ms: Option<f64>,
    /// Finished jobs whose duration is part of the average.
    pub timed: u64,
}

impl EngineStats {
    /// Jobs not yet finished (queued + processing).
    pub fn active(&self) -> u64 {
        self.queued + self.processing
    }

    /// Total processed jobs.
    pub fn processed(&self) -> u64 {
        self.completed + self.failed
    }

    /// Success rate as a percentage.
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.processed();
        if total == 0 {
            None
        } else {
            Some((self.completed as f64 / total as f64) * 100.0)
        }
    }

    /// Fold one finished job's duration into the running average.
    ///
    /// Jobs that finish without a measured duration are left out of it.
    pub fn record_duration(&mut self, duration_ms: u64) {
        self.timed += 1;
        let n = self.timed as f64;
        let previous = self.avg_duration_ms.unwrap_or(0.0);
        self.avg_duration_ms = Some(previous + (duration_ms as f64 - previous) / n);
    }
}
