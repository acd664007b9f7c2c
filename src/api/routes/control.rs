//! Capture and submission control endpoints.
//!
//! The handlers never drive the machines directly: triggers are forwarded to
//! the service loop over a channel, and the status endpoint reads the same
//! handles the machines write. The `controls` block mirrors the three UI
//! affordances (start / stop / submit).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::capture::{CapturePhase, CaptureStatusHandle};
use crate::submission::{SubmitPhase, SubmitStatusHandle};

/// Triggers the service loop executes on the machines.
#[derive(Debug, Clone, Copy)]
pub enum AppCommand {
    StartCapture,
    StopCapture,
    Submit,
}

#[derive(Clone)]
pub struct ControlState {
    pub tx: mpsc::Sender<AppCommand>,
    pub capture: CaptureStatusHandle,
    pub submission: SubmitStatusHandle,
    /// Whether the workflow currently holds a submittable artifact.
    pub artifact_ready: Arc<AtomicBool>,
}

pub fn router(state: ControlState) -> Router {
    Router::new()
        .route("/capture/start", post(start_capture))
        .route("/capture/stop", post(stop_capture))
        .route("/submit", post(submit))
        .route("/status", get(status))
        .with_state(state)
}

async fn start_capture(State(state): State<ControlState>) -> ApiResult<Json<Value>> {
    let capture = state.capture.get().await;
    if matches!(
        capture.phase,
        CapturePhase::Requesting | CapturePhase::Recording
    ) {
        return Err(ApiError::conflict("a capture is already in progress"));
    }

    info!("API: capture start requested");
    send(&state, AppCommand::StartCapture).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn stop_capture(State(state): State<ControlState>) -> ApiResult<Json<Value>> {
    let capture = state.capture.get().await;
    if capture.phase != CapturePhase::Recording {
        return Err(ApiError::conflict("no capture in progress"));
    }

    info!("API: capture stop requested");
    send(&state, AppCommand::StopCapture).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn submit(State(state): State<ControlState>) -> ApiResult<Json<Value>> {
    if !state.artifact_ready.load(Ordering::SeqCst) {
        return Err(ApiError::conflict("no recorded audio to submit"));
    }
    let submission = state.submission.get().await;
    if submission.phase != SubmitPhase::Idle {
        return Err(ApiError::conflict("a submission is already running"));
    }

    info!("API: submit requested");
    send(&state, AppCommand::Submit).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn status(State(state): State<ControlState>) -> Json<Value> {
    let capture = state.capture.get().await;
    let submission = state.submission.get().await;
    let artifact_ready = state.artifact_ready.load(Ordering::SeqCst);

    let can_start = !matches!(
        capture.phase,
        CapturePhase::Requesting | CapturePhase::Recording
    );
    let can_stop = capture.phase == CapturePhase::Recording;
    let can_submit = artifact_ready && submission.phase == SubmitPhase::Idle;

    Json(json!({
        "capture": {
            "phase": capture.phase.as_str(),
            "session_id": capture.session_id.map(|id| id.to_string()),
            "elapsed_seconds": capture.elapsed_seconds,
            "elapsed_text": capture.elapsed_text(),
            "started_at": capture.started_at.map(|t| t.to_rfc3339()),
            "last_error": capture.last_error,
        },
        "submission": {
            "phase": submission.phase.as_str(),
            "message": submission.message,
            "job_id": submission.job_id,
            "poll_attempts": submission.poll_attempts,
            "score": submission.score,
            "artifact_ready": artifact_ready,
        },
        "controls": {
            "can_start": can_start,
            "can_stop": can_stop,
            "can_submit": can_submit,
        },
    }))
}

async fn send(state: &ControlState, command: AppCommand) -> ApiResult<()> {
    state
        .tx
        .send(command)
        .await
        .map_err(|_| ApiError::internal("service loop is gone"))
}
