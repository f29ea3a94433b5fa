//! Order endpoints, expressed as engine call plus reply mapping.
//!
//! | Call | Route it stands for |
//! |---|---|
//! | [`OrderApi::submit_json`] | `POST /orders` |
//! | [`OrderApi::status`] | `GET /orders/{id}/status` |
//! | [`OrderApi::result`] | `GET /orders/{id}` |

use actors::OrderEngine;
use order_core::{JobId, JobState, JobStatus, OrderRequest, ResultLookup};

use crate::reply::{ACCEPTED, ApiError, JobStatusBody, NOT_FOUND, OK, Reply};

/// Order endpoints backed by a running engine.
#[derive(Clone)]
pub struct OrderApi {
    engine: OrderEngine,
}

impl OrderApi {
    pub fn new(engine: OrderEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &OrderEngine {
        &self.engine
    }

    /// Submit an order from a raw JSON body.
    pub fn submit_json(&self, body: &str) -> Reply {
        match serde_json::from_str::<OrderRequest>(body) {
            Ok(request) => self.submit(request),
            Err(e) => {
                tracing::debug!("Rejecting malformed order body: {}", e);
                ApiError::from(e).to_reply()
            }
        }
    }

    /// Submit an order. `202 {jobId, status: "QUEUED"}` on acceptance.
    pub fn submit(&self, request: OrderRequest) -> Reply {
        match self.engine.submit(request) {
            Ok(job_id) => Reply::json(ACCEPTED, &JobStatusBody::new(job_id, JobStatus::Queued)),
            Err(e) => {
                tracing::warn!("Order submission refused: {}", e);
                ApiError::from(e).to_reply()
            }
        }
    }

    /// Current status of a job.
    pub fn status(&self, raw_id: &str) -> Reply {
        let job_id = match parse_job_id(raw_id) {
            Ok(job_id) => job_id,
            Err(e) => return e.to_reply(),
        };

        match self.engine.state(&job_id) {
            Some(state) => Reply::json(OK, &JobStatusBody::from_state(job_id, &state)),
            None => Reply::empty(NOT_FOUND),
        }
    }

    /// Result of a completed job, or its status while there is none.
    pub fn result(&self, raw_id: &str) -> Reply {
        let job_id = match parse_job_id(raw_id) {
            Ok(job_id) => job_id,
            Err(e) => return e.to_reply(),
        };

        result_reply(job_id, self.engine.state(&job_id))
    }
}

/// Build the result reply from one snapshot of the job's state.
fn result_reply(job_id: JobId, state: Option<JobState>) -> Reply {
    let pending = state
        .as_ref()
        .map(|state| JobStatusBody::from_state(job_id, state));
    match (ResultLookup::from_state(state), pending) {
        (ResultLookup::Ready(result), _) => Reply::json(OK, &result),
        (ResultLookup::NotReady(_), Some(body)) => Reply::json(ACCEPTED, &body),
        _ => Reply::empty(NOT_FOUND),
    }
}

fn parse_job_id(raw_id: &str) -> Result<JobId, ApiError> {
    JobId::parse(raw_id.trim()).map_err(|_| ApiError::InvalidJobId(raw_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn parses_hyphenated_ids() {
        let job_id = JobId::new();
        assert_eq!(parse_job_id(&job_id.to_string()).unwrap(), job_id);
        assert_eq!(parse_job_id(&format!(" {} ", job_id)).unwrap(), job_id);
    }

    #[test]
    fn completed_snapshot_replies_with_its_result() {
        let job_id = JobId::new();
        let now = Utc::now();
        let request = OrderRequest::new("cust-1", "widget", 2, 10.0);
        let state = JobState::Completed {
            queued_at: now,
            started_at: now,
            completed_at: now,
            result: order_core::OrderResult::priced(job_id, &request),
        };

        let reply = result_reply(job_id, Some(state));
        assert_eq!(reply.status, OK);
        let body = reply.body.unwrap();
        assert_eq!(body["totalPrice"], 20.0);
        assert!(body.get("status").is_none());
    }

    #[test]
    fn unfinished_snapshot_replies_with_its_status() {
        let job_id = JobId::new();
        let now = Utc::now();
        let state = JobState::Processing {
            queued_at: now,
            started_at: now,
            worker_id: "worker-1".into(),
        };

        let reply = result_reply(job_id, Some(state));
        assert_eq!(reply.status, ACCEPTED);
        assert_eq!(reply.body.unwrap()["status"], "PROCESSING");
        assert_eq!(result_reply(job_id, None), Reply::empty(NOT_FOUND));
    }

    #[test]
    fn rejects_garbage_ids() {
        assert!(matches!(
            parse_job_id("not-a-job"),
            Err(ApiError::InvalidJobId(raw)) if raw == "not-a-job"
        ));
    }
}
