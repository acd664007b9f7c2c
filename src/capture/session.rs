//! Capture session lifecycle.
//!
//! One `CaptureSession` drives one microphone recording attempt: request the
//! device, buffer chunks while recording, enforce the hard duration limit,
//! and hand the finalized artifact off exactly once. Manual stop, the
//! auto-stop deadline and device loss all funnel through a single pump task,
//! so whichever fires first performs the stop and the rest are no-ops.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::{interval, sleep};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::device::{CaptureDevice, CaptureStream, EndReason, StreamEvent};
use super::status::CaptureStatusHandle;
use super::{AudioArtifact, CaptureError, CapturePhase};

/// Duration limits for a capture run.
#[derive(Debug, Clone, Copy)]
pub struct CaptureLimits {
    /// Hard deadline: recording is force-stopped after this long.
    pub max_duration: Duration,
}

impl Default for CaptureLimits {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(60),
        }
    }
}

/// What a capture run produced: the artifact, or a terminal capture failure.
pub type CaptureOutcome = Result<AudioArtifact, CaptureError>;

/// State machine for one recording attempt.
///
/// `start()` returns a oneshot receiver that resolves with the outcome no
/// matter how the session ends; the receiver is the only artifact handoff
/// path, so two artifacts from one run are impossible by construction.
pub struct CaptureSession {
    device: Arc<dyn CaptureDevice>,
    limits: CaptureLimits,
    status: CaptureStatusHandle,
    stop_tx: Mutex<Option<mpsc::Sender<()>>>,
}

impl CaptureSession {
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        limits: CaptureLimits,
        status: CaptureStatusHandle,
    ) -> Self {
        Self {
            device,
            limits,
            status,
            stop_tx: Mutex::new(None),
        }
    }

    pub fn status(&self) -> CaptureStatusHandle {
        self.status.clone()
    }

    /// Request the input device and begin recording.
    ///
    /// Rejected while a request or recording is already underway. On denial
    /// the session transitions to Failed and retains no partial state.
    pub async fn start(&self) -> Result<oneshot::Receiver<CaptureOutcome>, CaptureError> {
        let phase = self.status.get().await.phase;
        if matches!(phase, CapturePhase::Requesting | CapturePhase::Recording) {
            return Err(CaptureError::AlreadyActive);
        }

        self.status.requesting().await;

        let stream = match self.device.request_access().await {
            Ok(stream) => stream,
            Err(e) => {
                self.status.failed(e.to_string()).await;
                return Err(e);
            }
        };

        let session_id = Uuid::new_v4();
        self.status.recording(session_id).await;
        info!("Capture session {} recording", session_id);

        let (stop_tx, stop_rx) = mpsc::channel(1);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        *self.stop_tx.lock().await = Some(stop_tx);

        let status = self.status.clone();
        let limits = self.limits;
        tokio::spawn(pump(session_id, stream, status, limits, stop_rx, outcome_tx));

        Ok(outcome_rx)
    }

    /// Request a stop. Valid only while recording; once the deadline or a
    /// device loss has already ended the run this is a guarded no-op.
    pub async fn stop(&self) -> Result<(), CaptureError> {
        let phase = self.status.get().await.phase;
        if phase != CapturePhase::Recording {
            return Err(CaptureError::NotRecording);
        }

        if let Some(tx) = self.stop_tx.lock().await.as_ref() {
            // A full or closed channel means the pump is already finishing.
            let _ = tx.try_send(());
        }
        Ok(())
    }
}

enum Finish {
    Stopped,
    DeviceLost,
}

async fn pump(
    session_id: Uuid,
    mut stream: Box<dyn CaptureStream>,
    status: CaptureStatusHandle,
    limits: CaptureLimits,
    mut stop_rx: mpsc::Receiver<()>,
    outcome_tx: oneshot::Sender<CaptureOutcome>,
) {
    let mut buffer: Vec<Vec<u8>> = Vec::new();
    let mut elapsed = 0u64;

    let mut ticker = interval(Duration::from_secs(1));
    ticker.tick().await; // the immediate tick; elapsed feedback starts at 1s

    let deadline = sleep(limits.max_duration);
    tokio::pin!(deadline);

    let finish = loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                debug!("Capture session {} stop requested", session_id);
                break Finish::Stopped;
            }
            () = &mut deadline => {
                info!(
                    "Capture session {} hit the {}s limit, stopping",
                    session_id,
                    limits.max_duration.as_secs()
                );
                break Finish::Stopped;
            }
            _ = ticker.tick() => {
                elapsed += 1;
                status.set_elapsed(elapsed).await;
            }
            event = stream.next_event() => match event {
                StreamEvent::Chunk(data) => {
                    if !data.is_empty() {
                        buffer.push(data);
                    }
                }
                StreamEvent::Ended(EndReason::DeviceLost) => {
                    warn!("Capture session {} lost its input device", session_id);
                    break Finish::DeviceLost;
                }
                StreamEvent::Ended(EndReason::Closed) => {
                    debug!("Capture session {} stream drained", session_id);
                    break Finish::Stopped;
                }
            }
        }
    };
    // Leaving the loop cancels the deadline and the ticker; this is the one
    // place the session finalizes, so a second stop can never race a first.

    let media_type = stream.media_type().to_string();
    let trailing = stream.close().await;
    for chunk in trailing {
        if !chunk.is_empty() {
            buffer.push(chunk);
        }
    }

    let outcome = match finish {
        Finish::DeviceLost => {
            status.failed(CaptureError::DeviceLost.to_string()).await;
            Err(CaptureError::DeviceLost)
        }
        Finish::Stopped => {
            let artifact = AudioArtifact::from_chunks(buffer, media_type);
            if artifact.is_empty() {
                warn!("Capture session {} produced no audio", session_id);
                status.failed(CaptureError::EmptyArtifact.to_string()).await;
                Err(CaptureError::EmptyArtifact)
            } else {
                info!(
                    "Capture session {} stopped: {} bytes after {}s",
                    session_id,
                    artifact.len(),
                    elapsed
                );
                status.stopped().await;
                Ok(artifact)
            }
        }
    };

    let _ = outcome_tx.send(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct ScriptedStream {
        events: VecDeque<StreamEvent>,
        trailing: Vec<Vec<u8>>,
        released: Arc<AtomicBool>,
    }

    impl ScriptedStream {
        fn new(events: Vec<StreamEvent>, trailing: Vec<Vec<u8>>) -> (Self, Arc<AtomicBool>) {
            let released = Arc::new(AtomicBool::new(false));
            (
                Self {
                    events: events.into(),
                    trailing,
                    released: released.clone(),
                },
                released,
            )
        }
    }

    #[async_trait]
    impl CaptureStream for ScriptedStream {
        fn media_type(&self) -> &str {
            "audio/wav"
        }

        async fn next_event(&mut self) -> StreamEvent {
            match self.events.pop_front() {
                Some(event) => event,
                // Quiet source: no more scripted events, keep the pump alive.
                None => std::future::pending().await,
            }
        }

        async fn close(self: Box<Self>) -> Vec<Vec<u8>> {
            self.released.store(true, Ordering::SeqCst);
            self.trailing
        }
    }

    struct ScriptedDevice {
        streams: Mutex<VecDeque<Box<dyn CaptureStream>>>,
    }

    impl ScriptedDevice {
        fn single(stream: ScriptedStream) -> Arc<Self> {
            Arc::new(Self {
                streams: Mutex::new(VecDeque::from([Box::new(stream) as Box<dyn CaptureStream>])),
            })
        }
    }

    #[async_trait]
    impl CaptureDevice for ScriptedDevice {
        async fn request_access(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
            self.streams
                .lock()
                .await
                .pop_front()
                .ok_or_else(|| CaptureError::AccessDenied("no input device".to_string()))
        }
    }

    struct DeniedDevice;

    #[async_trait]
    impl CaptureDevice for DeniedDevice {
        async fn request_access(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
            Err(CaptureError::AccessDenied("permission refused".to_string()))
        }
    }

    fn session_with(stream: ScriptedStream, limits: CaptureLimits) -> CaptureSession {
        CaptureSession::new(
            ScriptedDevice::single(stream),
            limits,
            CaptureStatusHandle::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_stop_produces_artifact() {
        let (stream, released) = ScriptedStream::new(
            vec![
                StreamEvent::Chunk(vec![1, 2]),
                StreamEvent::Chunk(vec![3]),
            ],
            vec![vec![4, 5]],
        );
        let session = session_with(stream, CaptureLimits::default());

        let outcome = session.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.stop().await.unwrap();

        let artifact = outcome.await.unwrap().unwrap();
        assert_eq!(artifact.bytes(), &[1, 2, 3, 4, 5]);
        assert_eq!(artifact.media_type(), "audio/wav");
        assert!(released.load(Ordering::SeqCst));
        assert_eq!(session.status().get().await.phase, CapturePhase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_forces_stop() {
        let (stream, _) = ScriptedStream::new(vec![StreamEvent::Chunk(vec![9])], vec![]);
        let limits = CaptureLimits {
            max_duration: Duration::from_secs(60),
        };
        let session = session_with(stream, limits);

        let outcome = session.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(61)).await;

        let artifact = outcome.await.unwrap().unwrap();
        assert_eq!(artifact.bytes(), &[9]);
        assert_eq!(session.status().get().await.phase, CapturePhase::Stopped);

        // The deadline already performed the stop; a manual stop is rejected
        // by the phase guard and no second artifact can exist.
        assert_eq!(session.stop().await, Err(CaptureError::NotRecording));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_stop_cancels_deadline() {
        let (stream, _) = ScriptedStream::new(vec![StreamEvent::Chunk(vec![7])], vec![]);
        let session = session_with(stream, CaptureLimits::default());

        let outcome = session.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        session.stop().await.unwrap();

        let artifact = outcome.await.unwrap().unwrap();
        assert_eq!(artifact.bytes(), &[7]);

        // Long after the would-be deadline nothing else happens.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(session.status().get().await.phase, CapturePhase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_capture_fails_without_artifact() {
        let (stream, released) = ScriptedStream::new(vec![], vec![]);
        let session = session_with(stream, CaptureLimits::default());

        let outcome = session.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        session.stop().await.unwrap();

        assert_eq!(outcome.await.unwrap(), Err(CaptureError::EmptyArtifact));
        assert!(released.load(Ordering::SeqCst));
        assert_eq!(session.status().get().await.phase, CapturePhase::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_loss_surfaces_distinct_signal() {
        let (stream, released) = ScriptedStream::new(
            vec![
                StreamEvent::Chunk(vec![1]),
                StreamEvent::Ended(EndReason::DeviceLost),
            ],
            vec![],
        );
        let session = session_with(stream, CaptureLimits::default());

        let outcome = session.start().await.unwrap();
        assert_eq!(outcome.await.unwrap(), Err(CaptureError::DeviceLost));
        assert!(released.load(Ordering::SeqCst));

        let status = session.status().get().await;
        assert_eq!(status.phase, CapturePhase::Failed);
        assert_eq!(
            status.last_error.as_deref(),
            Some("the input device was lost during recording")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_recording_is_rejected() {
        let (stream, _) = ScriptedStream::new(vec![], vec![]);
        let session = session_with(stream, CaptureLimits::default());

        let _outcome = session.start().await.unwrap();
        assert!(matches!(
            session.start().await,
            Err(CaptureError::AlreadyActive)
        ));
    }

    #[tokio::test]
    async fn test_access_denied_transitions_to_failed() {
        let session = CaptureSession::new(
            Arc::new(DeniedDevice),
            CaptureLimits::default(),
            CaptureStatusHandle::default(),
        );

        match session.start().await {
            Err(CaptureError::AccessDenied(reason)) => {
                assert_eq!(reason, "permission refused");
            }
            other => panic!("expected access denial, got {other:?}"),
        }
        assert_eq!(session.status().get().await.phase, CapturePhase::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_start_is_rejected() {
        let (stream, _) = ScriptedStream::new(vec![], vec![]);
        let session = session_with(stream, CaptureLimits::default());
        assert_eq!(session.stop().await, Err(CaptureError::NotRecording));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_ticks_are_ui_feedback_only() {
        let (stream, _) = ScriptedStream::new(vec![], vec![]);
        let session = session_with(stream, CaptureLimits::default());

        let _outcome = session.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;

        let status = session.status().get().await;
        assert_eq!(status.phase, CapturePhase::Recording);
        assert_eq!(status.elapsed_seconds, 3);
        assert_eq!(status.elapsed_text(), "Recording: 3s");
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_failure() {
        let (first, _) = ScriptedStream::new(
            vec![StreamEvent::Ended(EndReason::DeviceLost)],
            vec![],
        );
        let (second, _) = ScriptedStream::new(vec![StreamEvent::Chunk(vec![8])], vec![]);
        let device = Arc::new(ScriptedDevice {
            streams: Mutex::new(VecDeque::from([
                Box::new(first) as Box<dyn CaptureStream>,
                Box::new(second) as Box<dyn CaptureStream>,
            ])),
        });
        let session = CaptureSession::new(
            device,
            CaptureLimits::default(),
            CaptureStatusHandle::default(),
        );

        let outcome = session.start().await.unwrap();
        assert_eq!(outcome.await.unwrap(), Err(CaptureError::DeviceLost));

        let outcome = session.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.stop().await.unwrap();
        let artifact = outcome.await.unwrap().unwrap();
        assert_eq!(artifact.bytes(), &[8]);
    }
}
