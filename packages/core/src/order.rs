//! Order payloads and the pricing computation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::JobId;

/// Caller-supplied order, immutable once submitted.
///
/// No validation happens here; degenerate quantities or prices flow through
/// processing and produce whatever the arithmetic yields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub customer_id: String,
    pub item: String,
    pub quantity: i64,
    pub unit_price: f64,
}

impl OrderRequest {
    pub fn new(
        customer_id: impl Into<String>,
        item: impl Into<String>,
        quantity: i64,
        unit_price: f64,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            item: item.into(),
            quantity,
            unit_price,
        }
    }

    /// `quantity * unit_price`, computed in floating point.
    pub fn total_price(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// Outcome of processing one order. Produced once per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    /// Echo of the job this result belongs to.
    pub job_id: JobId,
    pub total_price: f64,
    pub processed_at: DateTime<Utc>,
    pub message: String,
}

impl OrderResult {
    /// Price an order, stamping it with the current wall-clock time.
    pub fn priced(job_id: JobId, request: &OrderRequest) -> Self {
        Self {
            job_id,
            total_price: request.total_price(),
            processed_at: Utc::now(),
            message: format!("Order processed for customer {}", request.customer_id),
        }
    }
}
