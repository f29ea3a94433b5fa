//! Actor system for the order job engine.
//!
//! This crate provides the Ractor-based execution substrate that accepts
//! orders, hands them to workers and records their outcome in the job store.
//!
//! # Architecture
//!
//! - `OrderEngine` - Cloneable handle: submit, status, result, events, shutdown
//! - `Dispatcher` - Owns the FIFO of queued jobs and supervises the worker pool
//! - `WorkerActor` - Runs the processing pipeline for one job at a time
//!
//! # Usage
//!
//! ```ignore
//! use actors::{PricingProcessor, start_engine};
//! use order_core::{EngineConfig, OrderRequest};
//!
//! let (engine, handle) = start_engine(EngineConfig::default(), PricingProcessor).await?;
//! let job_id = engine.submit(OrderRequest::new("cust-1", "widget", 2, 10.0))?;
//! ```

mod dispatcher;
mod engine;
mod messages;
mod pipeline;
mod processor;
mod worker_actor;

pub use dispatcher::Dispatcher;
pub use engine::{OrderEngine, start_engine};
pub use messages::{DispatcherMessage, EngineError, WorkItem, WorkerMessage};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use processor::{
    FnProcessor, OrderProcessor, PricingProcessor, ProcessError, ProcessFuture, ProcessResult,
};
pub use worker_actor::WorkerActor;

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort, concurrency};
