use std::sync::{Arc, Once};
use std::time::Duration;

use actors::{FnProcessor, OrderProcessor, ProcessError, ProcessFuture};
use order_core::{JobId, OrderRequest, OrderResult};
use tokio::sync::Semaphore;

static TRACING: Once = Once::new();

/// Route engine logs through the test harness's captured output.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "actors=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// The acceptance order: two widgets at 10.0 each.
pub fn widget_order() -> OrderRequest {
    OrderRequest::new("cust-1", "widget", 2, 10.0)
}

/// Poll `check` every 50ms until it holds or `timeout` elapses.
pub async fn poll_until<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Prices orders, but only once a permit is added to `gate`.
pub fn gated_processor(gate: Arc<Semaphore>) -> impl OrderProcessor {
    FnProcessor::new(
        "gated",
        move |job_id: JobId, request: &OrderRequest| -> ProcessFuture {
            let gate = gate.clone();
            let request = request.clone();
            Box::pin(async move {
                let permit = gate
                    .acquire()
                    .await
                    .map_err(|e| ProcessError::Internal(e.to_string()))?;
                permit.forget();
                Ok(OrderResult::priced(job_id, &request))
            })
        },
    )
}

/// Prices orders after `delay`.
pub fn slow_processor(delay: Duration) -> impl OrderProcessor {
    FnProcessor::new(
        "slow",
        move |job_id: JobId, request: &OrderRequest| -> ProcessFuture {
            let request = request.clone();
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(OrderResult::priced(job_id, &request))
            })
        },
    )
}

/// Panics for customer `boom`, rejects customer `nostock`, prices the rest.
pub fn faulty_processor() -> impl OrderProcessor {
    FnProcessor::new(
        "faulty",
        |job_id: JobId, request: &OrderRequest| -> ProcessFuture {
            let request = request.clone();
            Box::pin(async move {
                match request.customer_id.as_str() {
                    "boom" => panic!("pricing table corrupted"),
                    "nostock" => Err(ProcessError::Rejected(format!(
                        "{} is out of stock",
                        request.item
                    ))),
                    _ => Ok(OrderResult::priced(job_id, &request)),
                }
            })
        },
    )
}
