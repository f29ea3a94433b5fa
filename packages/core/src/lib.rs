//! Core domain types for the order processing engine.
//!
//! This crate contains shared types used across all packages:
//! - JobId, JobStatus and JobState for tracked work items
//! - OrderRequest and OrderResult for the business payload
//! - EngineConfig and EngineStats for the execution substrate
//! - Events for real-time updates

mod config;
mod events;
mod job;
mod order;
mod stats;

pub use config::{ConfigError, EngineConfig};
pub use events::JobEvent;
pub use job::{JobId, JobState, JobStatus, ResultLookup};
pub use order::{OrderRequest, OrderResult};
pub use stats::EngineStats;
