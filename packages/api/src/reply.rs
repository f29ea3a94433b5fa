//! Reply bodies and status codes an HTTP layer would send.

use actors::EngineError;
use order_core::{JobId, JobState, JobStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub const OK: u16 = 200;
pub const ACCEPTED: u16 = 202;
pub const BAD_REQUEST: u16 = 400;
pub const NOT_FOUND: u16 = 404;
pub const INTERNAL_SERVER_ERROR: u16 = 500;
pub const SERVICE_UNAVAILABLE: u16 = 503;

/// A status code plus an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Option<JsonValue>,
}

impl Reply {
    /// Reply with `body` serialized to JSON.
    pub fn json<T: Serialize>(status: u16, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => Self {
                status,
                body: Some(value),
            },
            Err(e) => {
                tracing::warn!("Failed to serialize reply body: {}", e);
                Self::error(INTERNAL_SERVER_ERROR, "Failed to serialize response")
            }
        }
    }

    /// Reply with no body.
    pub fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    /// Reply with `{"message": ...}`.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        let body = ErrorBody {
            message: message.into(),
        };
        Self {
            status,
            body: serde_json::to_value(&body).ok(),
        }
    }
}

/// `{jobId, status}` plus the failure reason when there is one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusBody {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl JobStatusBody {
    pub fn new(job_id: JobId, status: JobStatus) -> Self {
        Self {
            job_id,
            status,
            reason: None,
        }
    }

    pub fn from_state(job_id: JobId, state: &JobState) -> Self {
        Self {
            job_id,
            status: state.status(),
            reason: state.reason().map(str::to_string),
        }
    }
}

/// Error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Failures an incoming call can hit before or during its engine operation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Carries the raw identifier that failed to parse.
    #[error("Invalid job id")]
    InvalidJobId(String),

    #[error("Malformed order: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ApiError {
    /// The reply this error turns into.
    pub fn to_reply(&self) -> Reply {
        let status = match self {
            ApiError::InvalidJobId(_) | ApiError::MalformedBody(_) => BAD_REQUEST,
            ApiError::Engine(EngineError::Overloaded { .. } | EngineError::ShuttingDown) => {
                SERVICE_UNAVAILABLE
            }
            ApiError::Engine(_) => INTERNAL_SERVER_ERROR,
        };
        Reply::error(status, self.to_string())
    }
}
