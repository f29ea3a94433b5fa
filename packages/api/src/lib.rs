//! Reply mapping for the order job engine.
//!
//! This crate turns engine calls into the status codes and JSON bodies an
//! HTTP layer would return:
//! - Submission answers `202` immediately with the new job id
//! - Status and result lookups answer `200`, `202`, `404` or `400`
//! - Overload and shutdown answer `503`

mod orders;
mod reply;

pub use orders::OrderApi;
pub use reply::{
    ACCEPTED, ApiError, BAD_REQUEST, ErrorBody, INTERNAL_SERVER_ERROR, JobStatusBody, NOT_FOUND,
    OK, Reply, SERVICE_UNAVAILABLE,
};

// Re-export core types for convenience
pub use order_core::{JobId, JobStatus, OrderRequest, OrderResult};
