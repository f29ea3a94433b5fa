//! Message types for actor communication.

use chrono::{DateTime, Utc};
use order_core::{ConfigError, EngineStats, JobId, OrderRequest};
use ractor::{ActorId, RpcReplyPort};
use store::StoreError;

use crate::pipeline::PipelineOutcome;

/// An accepted job on its way to a worker.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub job_id: JobId,
    pub request: OrderRequest,
    pub queued_at: DateTime<Utc>,
}

/// Messages for the dispatcher.
#[derive(Debug)]
pub enum DispatcherMessage {
    /// Hand a queued job over for processing.
    Dispatch { work: Box<WorkItem> },

    /// A worker finished the pipeline for a job and is idle again.
    JobFinished {
        worker: ActorId,
        job_id: JobId,
        outcome: PipelineOutcome,
    },

    /// Get engine stats.
    GetStats { reply: RpcReplyPort<EngineStats> },

    /// Stop the workers and the dispatcher.
    Shutdown,

    /// Periodic tick for housekeeping.
    Tick,
}

/// Messages for the WorkerActor.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Run the pipeline for one job.
    Process { work: Box<WorkItem> },

    /// Shutdown the worker.
    Shutdown,
}

/// Error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine overloaded: {capacity} jobs already waiting")]
    Overloaded { capacity: usize },

    #[error("Engine is shutting down")]
    ShuttingDown,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to spawn actor: {0}")]
    Spawn(String),

    #[error("Timeout")]
    Timeout,
}
