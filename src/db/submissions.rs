//! Local history of submissions and their outcomes.

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;

/// Terminal bookkeeping states for a submission row.
pub mod submission_status {
    pub const SUBMITTED: &str = "submitted";
    pub const SCORED: &str = "scored";
    pub const FAILED: &str = "failed";
    /// Polling gave up while the job was still running.
    pub const PROCESSING: &str = "processing";
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionRecord {
    pub id: i64,
    pub job_id: String,
    pub status: String,
    pub score: Option<f64>,
    pub message: Option<String>,
    pub duration_seconds: Option<i64>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

pub struct SubmissionRepository;

impl SubmissionRepository {
    /// Record a created job. Returns the row id.
    pub fn insert(conn: &Connection, job_id: &str, duration_seconds: Option<i64>) -> Result<i64> {
        conn.execute(
            "INSERT INTO submissions (job_id, duration_seconds) VALUES (?1, ?2)",
            rusqlite::params![job_id, duration_seconds],
        )
        .context("Failed to insert submission")?;

        Ok(conn.last_insert_rowid())
    }

    pub fn mark_scored(conn: &Connection, id: i64, score: Option<f64>) -> Result<()> {
        conn.execute(
            "UPDATE submissions
             SET status = ?1, score = ?2, completed_at = CURRENT_TIMESTAMP
             WHERE id = ?3",
            rusqlite::params![submission_status::SCORED, score, id],
        )
        .context("Failed to mark submission scored")?;
        Ok(())
    }

    pub fn mark_failed(conn: &Connection, id: i64, message: &str) -> Result<()> {
        conn.execute(
            "UPDATE submissions
             SET status = ?1, message = ?2, completed_at = CURRENT_TIMESTAMP
             WHERE id = ?3",
            rusqlite::params![submission_status::FAILED, message, id],
        )
        .context("Failed to mark submission failed")?;
        Ok(())
    }

    pub fn mark_processing(conn: &Connection, id: i64, message: &str) -> Result<()> {
        conn.execute(
            "UPDATE submissions
             SET status = ?1, message = ?2
             WHERE id = ?3",
            rusqlite::params![submission_status::PROCESSING, message, id],
        )
        .context("Failed to mark submission processing")?;
        Ok(())
    }

    pub fn recent(conn: &Connection, limit: usize) -> Result<Vec<SubmissionRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, job_id, status, score, message, duration_seconds,
                        created_at, completed_at
                 FROM submissions
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1",
            )
            .context("Failed to prepare history query")?;

        let records = stmt
            .query_map([limit], |row| {
                Ok(SubmissionRecord {
                    id: row.get(0)?,
                    job_id: row.get(1)?,
                    status: row.get(2)?,
                    score: row.get(3)?,
                    message: row.get(4)?,
                    duration_seconds: row.get(5)?,
                    created_at: row.get(6)?,
                    completed_at: row.get(7)?,
                })
            })
            .context("Failed to query submissions")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to map submissions")?;

        Ok(records)
    }
}
