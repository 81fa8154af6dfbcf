//! HTTP request handlers

use super::types::{ErrorResponse, JobResponse, StartJobRequest, StartJobResponse};
use super::AppState;
use crate::supervisor::RequestContext;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/jobs", post(start_job))
        .route("/api/jobs/:job_id", get(get_job))
        // Paths kept for existing frontends
        .route("/start-plan-trip", post(start_job))
        .route("/get-response/:job_id", get(get_job))
        .route("/health", get(health))
        .with_state(state)
}

async fn start_job(
    State(state): State<AppState>,
    Json(req): Json<StartJobRequest>,
) -> Result<Json<StartJobResponse>, AppError> {
    if req.message.trim().is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }
    let context = match req.context {
        None | Some(Value::Null) => None,
        Some(value @ Value::Object(_)) => Some(RequestContext::new(value)),
        Some(_) => {
            return Err(AppError::BadRequest(
                "context must be a JSON object".to_string(),
            ))
        }
    };

    let job_id = state.submit(req.message, context).await;
    tracing::info!(job_id = %job_id, "Job accepted");
    Ok(Json(StartJobResponse { job_id }))
}

async fn get_job(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    match state.jobs.get(&job_id).await {
        Some(snapshot) => Json(JobResponse::from(snapshot)).into_response(),
        None => (StatusCode::NOT_FOUND, Json(JobResponse::not_found())).into_response(),
    }
}

async fn health() -> &'static str {
    "ok"
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
