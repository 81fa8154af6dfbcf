//! API request and response types

use crate::jobs::{JobSnapshot, JobStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request to start a turn
#[derive(Debug, Deserialize)]
pub struct StartJobRequest {
    pub message: String,
    /// Optional caller context; `type: "personal_health_summary"` starts the summary flow
    #[serde(default)]
    pub context: Option<Value>,
}

/// Response with the new job id
#[derive(Debug, Serialize)]
pub struct StartJobResponse {
    pub job_id: String,
}

/// Poll result. `response` is null while the job is processing
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub status: &'static str,
    pub response: Option<String>,
}

impl JobResponse {
    pub fn not_found() -> Self {
        Self {
            status: "not_found",
            response: Some("Invalid job ID.".to_string()),
        }
    }
}

impl From<JobSnapshot> for JobResponse {
    fn from(snapshot: JobSnapshot) -> Self {
        Self {
            status: snapshot.status.as_str(),
            response: (snapshot.status != JobStatus::Processing).then_some(snapshot.response),
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
