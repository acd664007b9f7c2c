//! Submission runner shared by the `record` and `submit` commands.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::capture::AudioArtifact;
use crate::cli::args::SubmitCliArgs;
use crate::config::Config;
use crate::db::{self, SubmissionRepository};
use crate::submission::http::mime_type_for_extension;
use crate::submission::{
    ConflictDecider, DashboardRedirect, HttpScoreEndpoint, PolicyDecider, PollSettings,
    SubmissionWorkflow, SubmitOutcome, SubmitStatusHandle,
};

/// Handle the `submit <file>` command.
pub async fn handle_submit_command(args: SubmitCliArgs) -> Result<()> {
    if !args.file.exists() {
        bail!("File not found: {:?}", args.file);
    }

    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {:?}", args.file))?;
    if bytes.is_empty() {
        bail!("File is empty: {:?}", args.file);
    }

    let mime = mime_type_for_extension(args.file.extension().and_then(|e| e.to_str()));
    let artifact = AudioArtifact::new(bytes, mime);

    let config = Config::load()?;
    run_submission(&config, args.api_url, args.yes, artifact, None).await
}

/// Drive a loaded workflow to a terminal state with terminal feedback, then
/// record the outcome in the local history.
pub async fn run_submission(
    config: &Config,
    api_url: Option<String>,
    assume_overwrite: bool,
    artifact: AudioArtifact,
    duration_seconds: Option<i64>,
) -> Result<()> {
    let base_url = api_url.unwrap_or_else(|| config.server.base_url.clone());
    let endpoint = Arc::new(HttpScoreEndpoint::new(&base_url));

    let pb = progress_spinner();
    let decider: Arc<dyn ConflictDecider> = if assume_overwrite {
        Arc::new(PolicyDecider::new(true))
    } else {
        Arc::new(SpinnerDecider { pb: pb.clone() })
    };

    let status = SubmitStatusHandle::default();
    let mut workflow = SubmissionWorkflow::new(endpoint, decider, status.clone())
        .with_poll_settings(PollSettings {
            interval: Duration::from_millis(config.submission.poll_interval_ms),
            max_attempts: config.submission.max_poll_attempts,
        })
        .with_redirect_delay(Duration::from_millis(config.submission.redirect_delay_ms));

    if config.submission.open_dashboard {
        workflow = workflow.with_results_hook(Box::new(DashboardRedirect::new(
            config.server.dashboard_url(),
        )));
    }

    workflow.load_artifact(artifact).await?;

    // Mirror the workflow's status line onto the spinner while it runs.
    let mirror = tokio::spawn({
        let status = status.clone();
        let pb = pb.clone();
        async move {
            loop {
                tokio::time::sleep(Duration::from_millis(200)).await;
                let current = status.get().await;
                if !current.message.is_empty() {
                    pb.set_message(current.message);
                }
            }
        }
    });

    let result = workflow.submit().await;
    mirror.abort();
    pb.finish_and_clear();

    let outcome = result.context("Submission failed")?;
    record_history(workflow.job_id(), outcome, duration_seconds).await;

    let message = status.get().await.message;
    match outcome {
        SubmitOutcome::Scored { .. } => {
            println!("{message}");
            Ok(())
        }
        SubmitOutcome::StillProcessing => {
            println!("{message}");
            Ok(())
        }
        SubmitOutcome::JobFailed => bail!("{message}"),
    }
}

/// Confirm prompt that plays nicely with an active spinner.
struct SpinnerDecider {
    pb: ProgressBar,
}

#[async_trait]
impl ConflictDecider for SpinnerDecider {
    async fn confirm_overwrite(&self, message: &str) -> bool {
        let prompt = message.to_string();
        let pb = self.pb.clone();
        let answer = tokio::task::spawn_blocking(move || {
            pb.suspend(|| {
                Confirm::new()
                    .with_prompt(prompt)
                    .default(false)
                    .interact()
            })
        })
        .await;

        match answer {
            Ok(Ok(confirmed)) => confirmed,
            _ => {
                warn!("Conflict prompt failed, declining overwrite");
                false
            }
        }
    }
}

async fn record_history(job_id: Option<&str>, outcome: SubmitOutcome, duration: Option<i64>) {
    let Some(job_id) = job_id.map(str::to_string) else {
        return;
    };

    let write = tokio::task::spawn_blocking(move || -> Result<()> {
        let conn = db::init_db()?;
        let id = SubmissionRepository::insert(&conn, &job_id, duration)?;
        match outcome {
            SubmitOutcome::Scored { score } => SubmissionRepository::mark_scored(&conn, id, score),
            SubmitOutcome::JobFailed => {
                SubmissionRepository::mark_failed(&conn, id, "remote scoring failed")
            }
            SubmitOutcome::StillProcessing => {
                SubmissionRepository::mark_processing(&conn, id, "still running when polling stopped")
            }
        }
    })
    .await;

    match write {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Failed to record submission history: {}", e),
        Err(e) => warn!("History task failed: {}", e),
    }
}

fn progress_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
