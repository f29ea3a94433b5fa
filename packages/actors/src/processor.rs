//! Order processor trait and implementations.

use std::future::Future;
use std::pin::Pin;

use order_core::{JobId, OrderRequest, OrderResult};

/// Fault raised while computing an order result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Processing error: {0}")]
    Internal(String),
}

/// Result type for order processors.
pub type ProcessResult = Result<OrderResult, ProcessError>;

/// Future type for async order processors.
pub type ProcessFuture = Pin<Box<dyn Future<Output = ProcessResult> + Send>>;

/// Computes the business outcome of an order.
///
/// Implementations must not touch job state; the pipeline owns every status
/// write. Errors, panics and timeouts all end the job as `FAILED`.
pub trait OrderProcessor: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Compute the result for one order.
    fn process(&self, job_id: JobId, request: &OrderRequest) -> ProcessFuture;
}

/// Default processor: prices the order and stamps it with the current time.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingProcessor;

impl OrderProcessor for PricingProcessor {
    fn name(&self) -> &str {
        "pricing"
    }

    fn process(&self, job_id: JobId, request: &OrderRequest) -> ProcessFuture {
        let result = OrderResult::priced(job_id, request);
        Box::pin(async move { Ok(result) })
    }
}

/// A simple function-based processor.
pub struct FnProcessor<F>
where
    F: Fn(JobId, &OrderRequest) -> ProcessFuture + Send + Sync + 'static,
{
    name: String,
    processor: F,
}

impl<F> FnProcessor<F>
where
    F: Fn(JobId, &OrderRequest) -> ProcessFuture + Send + Sync + 'static,
{
    /// Create a new function-based processor.
    pub fn new(name: impl Into<String>, processor: F) -> Self {
        Self {
            name: name.into(),
            processor,
        }
    }
}

impl<F> OrderProcessor for FnProcessor<F>
where
    F: Fn(JobId, &OrderRequest) -> ProcessFuture + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, job_id: JobId, request: &OrderRequest) -> ProcessFuture {
        (self.processor)(job_id, request)
    }
}
