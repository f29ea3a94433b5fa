use chrono::{DateTime, Utc};
use order_core::{JobId, JobState, OrderRequest, OrderResult};
use store::{JobStore, StoreError};

/// Drive a job from submission to `COMPLETED`, finishing at `finished_at`.
pub fn complete_job(store: &JobStore, finished_at: DateTime<Utc>) -> Result<JobId, StoreError> {
    let job_id = JobId::new();
    store.insert_queued(job_id, finished_at)?;
    store.transition(
        job_id,
        JobState::Processing {
            queued_at: finished_at,
            started_at: finished_at,
            worker_id: "worker-test".into(),
        },
    )?;
    let request = OrderRequest::new("cust-1", "widget", 1, 1.0);
    store.transition(
        job_id,
        JobState::Completed {
            queued_at: finished_at,
            started_at: finished_at,
            completed_at: finished_at,
            result: OrderResult::priced(job_id, &request),
        },
    )?;
    Ok(job_id)
}

/// Drive a job to `FAILED`, finishing at `finished_at`.
pub fn fail_job(store: &JobStore, finished_at: DateTime<Utc>) -> Result<JobId, StoreError> {
    let job_id = JobId::new();
    store.insert_queued(job_id, finished_at)?;
    store.transition(
        job_id,
        JobState::Processing {
            queued_at: finished_at,
            started_at: finished_at,
            worker_id: "worker-test".into(),
        },
    )?;
    store.transition(
        job_id,
        JobState::Failed {
            queued_at: finished_at,
            started_at: finished_at,
            failed_at: finished_at,
            reason: "test failure".into(),
        },
    )?;
    Ok(job_id)
}
