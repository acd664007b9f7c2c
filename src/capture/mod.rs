pub mod artifact;
pub mod device;
pub mod mic;
pub mod session;
pub mod status;

pub use artifact::AudioArtifact;
pub use device::{CaptureDevice, CaptureStream, EndReason, StreamEvent};
pub use mic::MicCaptureDevice;
pub use session::{CaptureLimits, CaptureOutcome, CaptureSession};
pub use status::{CapturePhase, CaptureStatus, CaptureStatusHandle};

use thiserror::Error;

/// Terminal failures of a capture session. All are recoverable by starting a
/// fresh capture.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("microphone access denied: {0}")]
    AccessDenied(String),

    #[error("nothing was recorded")]
    EmptyArtifact,

    #[error("the input device was lost during recording")]
    DeviceLost,

    #[error("a capture is already in progress")]
    AlreadyActive,

    #[error("no capture in progress")]
    NotRecording,
}
