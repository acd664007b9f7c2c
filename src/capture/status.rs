//! Capture session status types and shared state handle.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Phase of one microphone capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapturePhase {
    Idle,
    Requesting,
    Recording,
    Stopped,
    Failed,
}

impl CapturePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting",
            Self::Recording => "recording",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

/// Current capture state, readable by API handlers and the CLI.
#[derive(Debug, Clone)]
pub struct CaptureStatus {
    pub phase: CapturePhase,
    pub session_id: Option<Uuid>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub elapsed_seconds: u64,
    pub last_error: Option<String>,
}

impl Default for CaptureStatus {
    fn default() -> Self {
        Self {
            phase: CapturePhase::Idle,
            session_id: None,
            started_at: None,
            elapsed_seconds: 0,
            last_error: None,
        }
    }
}

impl CaptureStatus {
    /// Elapsed-time text for the presentation layer while recording.
    pub fn elapsed_text(&self) -> String {
        match self.phase {
            CapturePhase::Recording => format!("Recording: {}s", self.elapsed_seconds),
            _ => String::new(),
        }
    }
}

/// Thread-safe handle shared between a session and its observers.
#[derive(Clone, Default)]
pub struct CaptureStatusHandle {
    inner: Arc<Mutex<CaptureStatus>>,
}

impl CaptureStatusHandle {
    pub async fn get(&self) -> CaptureStatus {
        self.inner.lock().await.clone()
    }

    pub async fn requesting(&self) {
        let mut status = self.inner.lock().await;
        status.phase = CapturePhase::Requesting;
        status.last_error = None;
    }

    pub async fn recording(&self, session_id: Uuid) {
        let mut status = self.inner.lock().await;
        status.phase = CapturePhase::Recording;
        status.session_id = Some(session_id);
        status.started_at = Some(chrono::Utc::now());
        status.elapsed_seconds = 0;
        status.last_error = None;
    }

    pub async fn set_elapsed(&self, seconds: u64) {
        let mut status = self.inner.lock().await;
        status.elapsed_seconds = seconds;
    }

    pub async fn stopped(&self) {
        let mut status = self.inner.lock().await;
        status.phase = CapturePhase::Stopped;
    }

    pub async fn failed(&self, error: String) {
        let mut status = self.inner.lock().await;
        status.phase = CapturePhase::Failed;
        status.last_error = Some(error);
    }

    pub async fn reset(&self) {
        let mut status = self.inner.lock().await;
        *status = CaptureStatus::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_as_str() {
        assert_eq!(CapturePhase::Idle.as_str(), "idle");
        assert_eq!(CapturePhase::Requesting.as_str(), "requesting");
        assert_eq!(CapturePhase::Recording.as_str(), "recording");
        assert_eq!(CapturePhase::Stopped.as_str(), "stopped");
        assert_eq!(CapturePhase::Failed.as_str(), "failed");
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&CapturePhase::Recording).unwrap();
        assert_eq!(json, "\"recording\"");

        let parsed: CapturePhase = serde_json::from_str("\"stopped\"").unwrap();
        assert_eq!(parsed, CapturePhase::Stopped);
    }

    #[tokio::test]
    async fn test_handle_lifecycle() {
        let handle = CaptureStatusHandle::default();
        assert_eq!(handle.get().await.phase, CapturePhase::Idle);

        handle.requesting().await;
        assert_eq!(handle.get().await.phase, CapturePhase::Requesting);

        let id = Uuid::new_v4();
        handle.recording(id).await;
        let status = handle.get().await;
        assert_eq!(status.phase, CapturePhase::Recording);
        assert_eq!(status.session_id, Some(id));
        assert!(status.started_at.is_some());

        handle.set_elapsed(3).await;
        assert_eq!(handle.get().await.elapsed_text(), "Recording: 3s");

        handle.stopped().await;
        let status = handle.get().await;
        assert_eq!(status.phase, CapturePhase::Stopped);
        assert!(status.elapsed_text().is_empty());
    }

    #[tokio::test]
    async fn test_handle_failure_and_reset() {
        let handle = CaptureStatusHandle::default();
        handle.failed("microphone unplugged".to_string()).await;

        let status = handle.get().await;
        assert_eq!(status.phase, CapturePhase::Failed);
        assert_eq!(status.last_error.as_deref(), Some("microphone unplugged"));

        handle.reset().await;
        assert_eq!(handle.get().await.phase, CapturePhase::Idle);
    }
}
