//! Service mode: wire the machines to the control API and drive everything
//! from one cooperative loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::api::{ApiServer, AppCommand, ControlState};
use crate::capture::{
    CaptureLimits, CaptureOutcome, CaptureSession, CaptureStatusHandle, MicCaptureDevice,
};
use crate::config::Config;
use crate::db::{self, SubmissionRepository};
use crate::submission::{
    ConflictDecider, ConflictPolicy, DashboardRedirect, HttpScoreEndpoint, PolicyDecider,
    PollSettings, SubmissionWorkflow, SubmitOutcome, SubmitStatusHandle, TerminalDecider,
};

pub async fn run_service() -> Result<()> {
    info!("Starting voxscore service");

    let config = Config::load()?;

    let (tx, mut rx) = mpsc::channel::<AppCommand>(10);

    let capture_status = CaptureStatusHandle::default();
    let device = Arc::new(MicCaptureDevice::new(config.capture.sample_rate));
    let limits = CaptureLimits {
        max_duration: Duration::from_secs(config.capture.max_duration_seconds),
    };
    let session = CaptureSession::new(device, limits, capture_status.clone());

    let submit_status = SubmitStatusHandle::default();
    let mut workflow = build_workflow(&config, submit_status.clone());

    let artifact_ready = Arc::new(AtomicBool::new(false));
    let api_server = ApiServer::new(
        config.api.port,
        ControlState {
            tx: tx.clone(),
            capture: capture_status.clone(),
            submission: submit_status.clone(),
            artifact_ready: artifact_ready.clone(),
        },
    );
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("Control API failed: {}", e);
        }
    });

    info!("voxscore is ready!");
    info!(
        "Start a recording: curl -X POST http://127.0.0.1:{}/capture/start",
        config.api.port
    );

    let mut pending_capture: Option<oneshot::Receiver<CaptureOutcome>> = None;
    let mut last_duration: Option<i64> = None;

    loop {
        tokio::select! {
            command = rx.recv() => {
                let Some(command) = command else { break };
                match command {
                    AppCommand::StartCapture => match session.start().await {
                        Ok(outcome_rx) => pending_capture = Some(outcome_rx),
                        Err(e) => error!("Failed to start capture: {}", e),
                    },
                    AppCommand::StopCapture => {
                        if let Err(e) = session.stop().await {
                            warn!("Stop request ignored: {}", e);
                        }
                    }
                    AppCommand::Submit => match workflow.submit().await {
                        Ok(outcome) => {
                            record_outcome(workflow.job_id(), outcome, last_duration);
                        }
                        Err(e) => error!("Submission failed: {}", e),
                    },
                }
            }
            // The capture can end without a command: the 60s deadline or a
            // device loss stops it from inside the session.
            outcome = wait_capture(&mut pending_capture), if pending_capture.is_some() => {
                pending_capture = None;
                match outcome {
                    Some(Ok(artifact)) => {
                        last_duration =
                            Some(capture_status.get().await.elapsed_seconds as i64);
                        match workflow.load_artifact(artifact).await {
                            Ok(()) => {
                                artifact_ready.store(true, Ordering::SeqCst);
                                info!("Recording ready to submit");
                            }
                            Err(e) => error!("Discarding capture: {}", e),
                        }
                    }
                    Some(Err(e)) => info!("Capture ended without a recording: {}", e),
                    None => warn!("Capture ended without reporting an outcome"),
                }
            }
        }
    }

    Ok(())
}

async fn wait_capture(
    pending: &mut Option<oneshot::Receiver<CaptureOutcome>>,
) -> Option<CaptureOutcome> {
    match pending.as_mut() {
        Some(rx) => rx.await.ok(),
        None => std::future::pending().await,
    }
}

pub fn build_workflow(config: &Config, status: SubmitStatusHandle) -> SubmissionWorkflow {
    let endpoint = Arc::new(HttpScoreEndpoint::new(&config.server.base_url));
    let decider: Arc<dyn ConflictDecider> = match config.submission.on_conflict {
        ConflictPolicy::Ask => Arc::new(TerminalDecider),
        ConflictPolicy::Overwrite => Arc::new(PolicyDecider::new(true)),
        ConflictPolicy::Discard => Arc::new(PolicyDecider::new(false)),
    };

    let mut workflow = SubmissionWorkflow::new(endpoint, decider, status)
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

    workflow
}

/// Persist a terminal outcome to the local history. Best effort — a failed
/// write must not disturb the workflow.
pub fn record_outcome(job_id: Option<&str>, outcome: SubmitOutcome, duration_seconds: Option<i64>) {
    let Some(job_id) = job_id.map(str::to_string) else {
        return;
    };

    tokio::task::spawn_blocking(move || {
        let result = (|| -> Result<()> {
            let conn = db::init_db()?;
            let id = SubmissionRepository::insert(&conn, &job_id, duration_seconds)?;
            match outcome {
                SubmitOutcome::Scored { score } => {
                    SubmissionRepository::mark_scored(&conn, id, score)?;
                }
                SubmitOutcome::JobFailed => {
                    SubmissionRepository::mark_failed(&conn, id, "remote scoring failed")?;
                }
                SubmitOutcome::StillProcessing => {
                    SubmissionRepository::mark_processing(
                        &conn,
                        id,
                        "still running when polling stopped",
                    )?;
                }
            }
            Ok(())
        })();

        if let Err(e) = result {
            warn!("Failed to record submission history: {}", e);
        }
    });
}
