//! HTTP API: start a turn as a job, then poll for its result

mod handlers;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::archive::{ArchivedTurn, TurnArchive};
use crate::jobs::{JobStatus, JobStore};
use crate::runtime::TurnRuntime;
use crate::supervisor::RequestContext;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<TurnRuntime>,
    pub jobs: JobStore,
    pub archive: Option<Arc<dyn TurnArchive>>,
}

impl AppState {
    pub fn new(runtime: TurnRuntime, jobs: JobStore, archive: Option<Arc<dyn TurnArchive>>) -> Self {
        Self {
            runtime: Arc::new(runtime),
            jobs,
            archive,
        }
    }

    /// Register a job and run its turn in the background
    pub async fn submit(&self, message: String, context: Option<RequestContext>) -> String {
        let job_id = self.jobs.create().await;
        let state = self.clone();
        let id = job_id.clone();
        let span = tracing::info_span!("turn", job_id = %id);
        tokio::spawn(async move { state.run_job(id, message, context).await }.instrument(span));
        job_id
    }

    async fn run_job(&self, job_id: String, message: String, context: Option<RequestContext>) {
        let created_at = Utc::now();
        tracing::info!(flow = ?context.as_ref().and_then(RequestContext::kind), "Turn started");
        let (status, output, log) = match self.runtime.run_turn(&message, context).await {
            Ok(outcome) => {
                tracing::info!(hops = outcome.hops, "Turn finished");
                let log = serde_json::to_value(&outcome.log).unwrap_or(Value::Null);
                self.jobs.complete(&job_id, outcome.output.clone()).await;
                (JobStatus::Done, outcome.output, log)
            }
            Err(failure) => {
                tracing::warn!(error = %failure.error, hops = failure.hops, "Turn failed");
                let log = serde_json::to_value(&failure.log).unwrap_or(Value::Null);
                let message = format!("Error: {}", failure.error);
                self.jobs.fail(&job_id, message.clone()).await;
                (JobStatus::Error, message, log)
            }
        };

        if let Some(archive) = &self.archive {
            let record = ArchivedTurn {
                job_id: job_id.clone(),
                status,
                output,
                log,
                created_at,
                finished_at: Utc::now(),
            };
            if let Err(e) = archive.record(record).await {
                tracing::error!(job_id = %job_id, error = %e, "Failed to archive turn");
            }
        }
    }
}
