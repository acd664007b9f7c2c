//! Audio input device abstraction.
//!
//! A `CaptureDevice` grants exclusive access to an input stream; the stream
//! yields binary chunks while active and an end-of-stream notification when
//! the source goes away. Backends decide the chunk encoding — the session
//! only buffers and concatenates.

use async_trait::async_trait;

use super::CaptureError;

/// Why a stream stopped producing chunks on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The source drained normally (backend closed, no more data coming).
    Closed,
    /// The input device disappeared mid-capture (unplugged, OS revocation).
    DeviceLost,
}

/// One event from an active capture stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Chunk(Vec<u8>),
    Ended(EndReason),
}

/// An exclusively-held audio input stream.
#[async_trait]
pub trait CaptureStream: Send {
    /// Media type of the assembled chunk sequence.
    fn media_type(&self) -> &str;

    /// Next chunk or end-of-stream. Pends while the source is quiet.
    async fn next_event(&mut self) -> StreamEvent;

    /// Finalize the recorder and release the device. Returns any chunks
    /// flushed after the last `next_event` call.
    async fn close(self: Box<Self>) -> Vec<Vec<u8>>;
}

/// Provider of exclusive audio input access.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Request the input device. Denial (no device, permission refused,
    /// backend failure) surfaces as [`CaptureError::AccessDenied`].
    async fn request_access(&self) -> Result<Box<dyn CaptureStream>, CaptureError>;
}
