pub mod submissions;

pub use submissions::{SubmissionRecord, SubmissionRepository};

use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn init_db() -> Result<Connection> {
    let db_path = crate::global::db_file()?;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let conn = Connection::open(&db_path).context("Failed to open database connection")?;

    migrate(&conn)?;

    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS submissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'submitted',
            score REAL,
            message TEXT,
            duration_seconds INTEGER,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            completed_at TIMESTAMP
        )",
        [],
    )
    .context("Failed to create submissions table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_submissions_created_at
         ON submissions(created_at DESC)",
        [],
    )
    .context("Failed to create index on created_at")?;

    Ok(())
}
