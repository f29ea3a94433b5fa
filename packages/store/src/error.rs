use order_core::{JobId, JobStatus};
use thiserror::Error;

/// Job store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    UnknownJob(JobId),

    #[error("Job already exists: {0}")]
    DuplicateJob(JobId),

    #[error("Job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },
}
