//! Archive of finished turns
//!
//! When configured, every terminal job is written to SQLite together with
//! its conversation log.

use crate::jobs::JobStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS turns (
    job_id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    output TEXT NOT NULL,
    log TEXT NOT NULL,
    created_at TEXT NOT NULL,
    finished_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_turns_finished ON turns(finished_at DESC);
";

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Archive connection poisoned")]
    Poisoned,
    #[error("Archive task failed: {0}")]
    Task(String),
    #[error("Corrupt archive row for {job_id}: {reason}")]
    Corrupt { job_id: String, reason: String },
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// One finished turn
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedTurn {
    pub job_id: String,
    pub status: JobStatus,
    /// Returned fragment, or the error message for failed turns
    pub output: String,
    /// Serialized conversation log; empty array when the turn failed
    pub log: Value,
    pub created_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Sink for finished turns
#[async_trait]
pub trait TurnArchive: Send + Sync {
    async fn record(&self, turn: ArchivedTurn) -> ArchiveResult<()>;
}

/// Thread-safe SQLite archive handle
#[derive(Clone)]
pub struct SqliteArchive {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteArchive {
    /// Open or create the archive at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> ArchiveResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory archive (for testing)
    pub fn open_in_memory() -> ArchiveResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> ArchiveResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn insert(&self, turn: &ArchivedTurn) -> ArchiveResult<()> {
        let conn = self.conn.lock().map_err(|_| ArchiveError::Poisoned)?;
        conn.execute(
            "INSERT OR REPLACE INTO turns (job_id, status, output, log, created_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                turn.job_id,
                turn.status.as_str(),
                turn.output,
                serde_json::to_string(&turn.log)?,
                turn.created_at.to_rfc3339(),
                turn.finished_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Look up an archived turn by job id
    pub fn get(&self, job_id: &str) -> ArchiveResult<Option<ArchivedTurn>> {
        let conn = self.conn.lock().map_err(|_| ArchiveError::Poisoned)?;
        let row = conn
            .query_row(
                "SELECT job_id, status, output, log, created_at, finished_at FROM turns WHERE job_id = ?1",
                params![job_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((job_id, status, output, log, created_at, finished_at)) = row else {
            return Ok(None);
        };
        Ok(Some(ArchivedTurn {
            status: parse_status(&job_id, &status)?,
            created_at: parse_datetime(&job_id, &created_at)?,
            finished_at: parse_datetime(&job_id, &finished_at)?,
            log: serde_json::from_str(&log)?,
            job_id,
            output,
        }))
    }

    pub fn count(&self) -> ArchiveResult<u64> {
        let conn = self.conn.lock().map_err(|_| ArchiveError::Poisoned)?;
        Ok(conn.query_row("SELECT COUNT(*) FROM turns", [], |row| row.get(0))?)
    }
}

#[async_trait]
impl TurnArchive for SqliteArchive {
    async fn record(&self, turn: ArchivedTurn) -> ArchiveResult<()> {
        let archive = self.clone();
        tokio::task::spawn_blocking(move || archive.insert(&turn))
            .await
            .map_err(|e| ArchiveError::Task(e.to_string()))?
    }
}

/// Only terminal turns are archived
fn parse_status(job_id: &str, s: &str) -> ArchiveResult<JobStatus> {
    match s {
        "done" => Ok(JobStatus::Done),
        "error" => Ok(JobStatus::Error),
        other => Err(ArchiveError::Corrupt {
            job_id: job_id.to_string(),
            reason: format!("unexpected status {other:?}"),
        }),
    }
}

fn parse_datetime(job_id: &str, s: &str) -> ArchiveResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ArchiveError::Corrupt {
            job_id: job_id.to_string(),
            reason: format!("bad timestamp {s:?}: {e}"),
        })
}
