//! In-memory job store for the polling API
//!
//! A job holds only the result of a turn, never its session state. Finished
//! jobs are evicted once they have been terminal for longer than the TTL.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Done,
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

/// What a poller sees
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub response: String,
}

#[derive(Debug)]
struct JobEntry {
    status: JobStatus,
    response: String,
    finished_at: Option<Instant>,
}

impl JobEntry {
    fn expired(&self, now: Instant, ttl: Duration) -> bool {
        self.finished_at
            .is_some_and(|at| now.saturating_duration_since(at) >= ttl)
    }
}

#[derive(Clone)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<String, JobEntry>>>,
    ttl: Duration,
}

impl JobStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Register a new job in `processing` and return its id
    pub async fn create(&self) -> String {
        let job_id = uuid::Uuid::new_v4().to_string();
        self.jobs.write().await.insert(
            job_id.clone(),
            JobEntry {
                status: JobStatus::Processing,
                response: String::new(),
                finished_at: None,
            },
        );
        job_id
    }

    pub async fn complete(&self, job_id: &str, output: String) {
        self.finish(job_id, JobStatus::Done, output).await;
    }

    pub async fn fail(&self, job_id: &str, message: String) {
        self.finish(job_id, JobStatus::Error, message).await;
    }

    async fn finish(&self, job_id: &str, status: JobStatus, response: String) {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(job_id) {
            Some(entry) if !entry.status.is_terminal() => {
                entry.status = status;
                entry.response = response;
                entry.finished_at = Some(Instant::now());
            }
            Some(_) => tracing::warn!(job_id, "Job already finished"),
            None => tracing::warn!(job_id, "Finishing unknown or evicted job"),
        }
    }

    /// Current status; expired jobs read as absent even before the sweep
    pub async fn get(&self, job_id: &str) -> Option<JobSnapshot> {
        let jobs = self.jobs.read().await;
        let entry = jobs.get(job_id)?;
        if entry.expired(Instant::now(), self.ttl) {
            return None;
        }
        Some(JobSnapshot {
            status: entry.status,
            response: entry.response.clone(),
        })
    }

    /// Evict jobs that have been terminal for at least the TTL as of `now`
    pub async fn sweep(&self, now: Instant) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, entry| !entry.expired(now, self.ttl));
        before - jobs.len()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Periodically evict expired jobs until `cancel` fires
    pub fn spawn_sweeper(&self, every: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = store.sweep(Instant::now()).await;
                        if evicted > 0 {
                            tracing::debug!(evicted, "Evicted expired jobs");
                        }
                    }
                }
            }
        })
    }
}
