//! In-memory job storage for the order engine.
//!
//! This crate provides the concurrent map that holds every job's state for
//! the lifetime of the process, plus an optional retention policy for
//! dropping finished jobs.
//!
//! Every operation is atomic per job; nothing locks across jobs.

mod error;
mod job_store;
mod retention;

pub use error::StoreError;
pub use job_store::{JobStore, StatusCounts};
pub use retention::RetentionPolicy;
