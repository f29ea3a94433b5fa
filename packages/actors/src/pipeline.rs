//! The per-job processing step run by a worker.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use order_core::{JobEvent, JobId, JobState, OrderRequest, OrderResult};
use store::JobStore;
use tokio::sync::broadcast;

use crate::messages::WorkItem;
use crate::processor::OrderProcessor;

/// How one pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed { duration_ms: u64 },
    Failed { duration_ms: u64 },
    /// The job was not in a state this run could advance (unknown or already
    /// picked up), so nothing was processed.
    Skipped,
}

/// Drives a job from `QUEUED` through `PROCESSING` to a terminal state.
pub struct Pipeline {
    store: Arc<JobStore>,
    processor: Arc<dyn OrderProcessor>,
    event_tx: broadcast::Sender<JobEvent>,
    timeout: Duration,
}

impl Pipeline {
    pub fn new(
        store: Arc<JobStore>,
        processor: Arc<dyn OrderProcessor>,
        event_tx: broadcast::Sender<JobEvent>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            processor,
            event_tx,
            timeout,
        }
    }

    /// Process one job. Never fails: every processor fault becomes `FAILED`.
    pub async fn run(&self, worker_id: &str, work: WorkItem) -> PipelineOutcome {
        let WorkItem {
            job_id,
            request,
            queued_at,
        } = work;

        let started_at = Utc::now();
        let processing = JobState::Processing {
            queued_at,
            started_at,
            worker_id: worker_id.to_string(),
        };
        if let Err(e) = self.store.transition(job_id, processing) {
            tracing::warn!("Worker {} skipping job {}: {}", worker_id, job_id, e);
            return PipelineOutcome::Skipped;
        }
        tracing::debug!("Worker {} processing job {}", worker_id, job_id);
        self.emit(JobEvent::JobStarted {
            job_id,
            worker_id: worker_id.to_string(),
            timestamp: started_at,
        });

        let computed = self.invoke(job_id, request).await;

        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        // Result and COMPLETED are written together in one record.
        let (next, outcome) = match computed {
            Ok(result) => (
                JobState::Completed {
                    queued_at,
                    started_at,
                    completed_at: finished_at,
                    result,
                },
                PipelineOutcome::Completed { duration_ms },
            ),
            Err(reason) => (
                JobState::Failed {
                    queued_at,
                    started_at,
                    failed_at: finished_at,
                    reason,
                },
                PipelineOutcome::Failed { duration_ms },
            ),
        };
        let event = match &next {
            JobState::Failed { reason, .. } => JobEvent::JobFailed {
                job_id,
                reason: reason.clone(),
                timestamp: finished_at,
            },
            _ => JobEvent::JobCompleted {
                job_id,
                duration_ms,
                timestamp: finished_at,
            },
        };

        if let Err(e) = self.store.transition(job_id, next) {
            tracing::warn!("Worker {} could not finish job {}: {}", worker_id, job_id, e);
            return PipelineOutcome::Skipped;
        }

        match outcome {
            PipelineOutcome::Failed { .. } => tracing::warn!("{}", event.description()),
            _ => tracing::debug!("{}", event.description()),
        }
        self.emit(event);

        outcome
    }

    /// Call the processor with the fault boundary around it.
    async fn invoke(&self, job_id: JobId, request: OrderRequest) -> Result<OrderResult, String> {
        let processor = Arc::clone(&self.processor);
        let call = async move { processor.process(job_id, &request).await };

        match tokio::time::timeout(self.timeout, AssertUnwindSafe(call).catch_unwind()).await {
            Err(_) => Err(format!("Processing timed out after {:?}", self.timeout)),
            Ok(Err(panic)) => Err(format!(
                "Processor {} panicked: {}",
                self.processor.name(),
                panic_message(panic.as_ref())
            )),
            Ok(Ok(Err(e))) => Err(e.to_string()),
            Ok(Ok(Ok(result))) if result.job_id != job_id => Err(format!(
                "Processor returned a result for job {}",
                result.job_id
            )),
            Ok(Ok(Ok(result))) => Ok(result),
        }
    }

    fn emit(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
