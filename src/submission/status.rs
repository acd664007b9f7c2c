//! Submission workflow status types and shared state handle.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Phase of the submit → negotiate → poll protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitPhase {
    Idle,
    Uploading,
    AwaitingConflictDecision,
    Overwriting,
    Submitted,
    Polling,
    Finished,
    Failed,
}

impl SubmitPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::AwaitingConflictDecision => "awaiting_conflict_decision",
            Self::Overwriting => "overwriting",
            Self::Submitted => "submitted",
            Self::Polling => "polling",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }
}

/// Current workflow state, readable by API handlers and the CLI.
#[derive(Debug, Clone)]
pub struct SubmitStatus {
    pub phase: SubmitPhase,
    /// Status line for the presentation layer.
    pub message: String,
    pub job_id: Option<String>,
    pub poll_attempts: u32,
    pub score: Option<f64>,
}

impl Default for SubmitStatus {
    fn default() -> Self {
        Self {
            phase: SubmitPhase::Idle,
            message: String::new(),
            job_id: None,
            poll_attempts: 0,
            score: None,
        }
    }
}

/// Thread-safe handle shared between the workflow and its observers.
#[derive(Clone, Default)]
pub struct SubmitStatusHandle {
    inner: Arc<Mutex<SubmitStatus>>,
}

impl SubmitStatusHandle {
    pub async fn get(&self) -> SubmitStatus {
        self.inner.lock().await.clone()
    }

    pub async fn set_phase(&self, phase: SubmitPhase, message: impl Into<String>) {
        let mut status = self.inner.lock().await;
        status.phase = phase;
        status.message = message.into();
    }

    pub async fn submitted(&self, job_id: String, message: impl Into<String>) {
        let mut status = self.inner.lock().await;
        status.phase = SubmitPhase::Submitted;
        status.job_id = Some(job_id);
        status.message = message.into();
    }

    pub async fn set_poll_attempts(&self, attempts: u32) {
        let mut status = self.inner.lock().await;
        status.poll_attempts = attempts;
    }

    pub async fn finished(&self, score: Option<f64>, message: impl Into<String>) {
        let mut status = self.inner.lock().await;
        status.phase = SubmitPhase::Finished;
        status.score = score;
        status.message = message.into();
    }

    /// Back to Idle after a recoverable submit failure; the artifact stays
    /// loaded and the submit affordance is enabled again.
    pub async fn idle_after_failure(&self, message: impl Into<String>) {
        let mut status = self.inner.lock().await;
        status.phase = SubmitPhase::Idle;
        status.job_id = None;
        status.poll_attempts = 0;
        status.message = message.into();
    }

    pub async fn reset(&self) {
        let mut status = self.inner.lock().await;
        *status = SubmitStatus::default();
    }
}
