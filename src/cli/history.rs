//! CLI handler for browsing submission history.

use anyhow::Result;

use crate::cli::args::HistoryCliArgs;
use crate::db::{self, SubmissionRepository};

pub fn handle_history_command(args: HistoryCliArgs) -> Result<()> {
    let conn = db::init_db()?;
    let records = SubmissionRepository::recent(&conn, args.limit)?;

    if records.is_empty() {
        println!("No submissions yet.");
        return Ok(());
    }

    println!("{:>4}  {:<19}  {:<10}  {:>6}  JOB", "ID", "DATE", "STATUS", "SCORE");
    for record in records {
        let score = record
            .score
            .map(|s| {
                if s.fract() == 0.0 {
                    format!("{s:.0}")
                } else {
                    format!("{s:.1}")
                }
            })
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>4}  {:<19}  {:<10}  {:>6}  {}",
            record.id, record.created_at, record.status, score, record.job_id
        );
    }

    Ok(())
}
