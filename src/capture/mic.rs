//! Microphone capture via cpal.
//!
//! The `cpal::Stream` is not `Send`, so a dedicated thread owns it for the
//! stream's whole lifetime: it builds the input stream, forwards PCM chunks
//! over a channel, and drops the stream (releasing the device) when the
//! session closes the capture stream or its handle goes away.

use std::io::Cursor;
use std::sync::mpsc as std_mpsc;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::{SampleFormat, WavSpec, WavWriter};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use super::device::{CaptureDevice, CaptureStream, EndReason, StreamEvent};
use super::CaptureError;

const WAV_MEDIA_TYPE: &str = "audio/wav";

/// Default input microphone as a capture device.
pub struct MicCaptureDevice {
    sample_rate: u32,
}

impl MicCaptureDevice {
    /// # Arguments
    /// * `sample_rate` - Mono capture rate (16000 is plenty for speech scoring)
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

#[async_trait]
impl CaptureDevice for MicCaptureDevice {
    async fn request_access(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel();

        let sample_rate = self.sample_rate;
        std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || capture_thread(sample_rate, ready_tx, event_tx, shutdown_rx))
            .map_err(|e| CaptureError::AccessDenied(format!("capture thread: {e}")))?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(Box::new(MicCaptureStream {
                events: event_rx,
                shutdown: Some(shutdown_tx),
            })),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CaptureError::AccessDenied(
                "capture thread exited before the stream opened".to_string(),
            )),
        }
    }
}

struct MicCaptureStream {
    events: mpsc::UnboundedReceiver<StreamEvent>,
    shutdown: Option<std_mpsc::Sender<()>>,
}

#[async_trait]
impl CaptureStream for MicCaptureStream {
    fn media_type(&self) -> &str {
        WAV_MEDIA_TYPE
    }

    async fn next_event(&mut self) -> StreamEvent {
        self.events
            .recv()
            .await
            .unwrap_or(StreamEvent::Ended(EndReason::Closed))
    }

    async fn close(mut self: Box<Self>) -> Vec<Vec<u8>> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        // Drain whatever the callback pushed before the stream was dropped.
        let mut trailing = Vec::new();
        while let Some(event) = self.events.recv().await {
            match event {
                StreamEvent::Chunk(chunk) => trailing.push(chunk),
                StreamEvent::Ended(_) => break,
            }
        }
        trailing
    }
}

impl Drop for MicCaptureStream {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            debug!("Dropping active mic stream, releasing device");
            let _ = shutdown.send(());
        }
    }
}

fn capture_thread(
    sample_rate: u32,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
    event_tx: mpsc::UnboundedSender<StreamEvent>,
    shutdown_rx: std_mpsc::Receiver<()>,
) {
    let host = cpal::default_host();
    let device = match host.default_input_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err(CaptureError::AccessDenied(
                "no input device available".to_string(),
            )));
            return;
        }
    };

    info!(
        "Capturing from input device: {}",
        device.name().unwrap_or_else(|_| "unknown".to_string())
    );

    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let chunk_tx = event_tx.clone();
    let mut header_sent = false;
    let data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
        if !header_sent {
            header_sent = true;
            let _ = chunk_tx.send(StreamEvent::Chunk(wav_stream_header(sample_rate)));
        }
        let _ = chunk_tx.send(StreamEvent::Chunk(pcm16_bytes(data)));
    };

    let loss_tx = event_tx.clone();
    let err_fn = move |err: cpal::StreamError| {
        error!("Input stream error: {}", err);
        let _ = loss_tx.send(StreamEvent::Ended(EndReason::DeviceLost));
    };

    let stream = match device.build_input_stream(&config, data_fn, err_fn, None) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(CaptureError::AccessDenied(e.to_string())));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(CaptureError::AccessDenied(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // Park until the session closes its stream handle, then release the mic.
    let _ = shutdown_rx.recv();
    drop(stream);
    let _ = event_tx.send(StreamEvent::Ended(EndReason::Closed));
    debug!("Input device released");
}

fn pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// WAV header for a mono 16-bit stream of unknown length.
///
/// The RIFF and data sizes carry the open-ended sentinel, so concatenating
/// this header with the raw PCM chunks that follow yields a playable file
/// without seeking back to patch lengths.
fn wav_stream_header(sample_rate: u32) -> Vec<u8> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    match WavWriter::new(&mut cursor, spec).map(WavWriter::finalize) {
        Ok(Ok(())) => {}
        _ => {
            // WavWriter cannot fail against an in-memory cursor, but a capture
            // callback has nowhere to report to; an empty chunk is dropped
            // upstream and the capture surfaces as empty.
            return Vec::new();
        }
    }

    let mut header = cursor.into_inner();
    let len = header.len();
    header[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
    header[len - 4..].copy_from_slice(&u32::MAX.to_le_bytes());
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm16_conversion_clamps() {
        let bytes = pcm16_bytes(&[0.0, 1.0, -1.0, 2.0]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 0);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([bytes[4], bytes[5]]), -i16::MAX);
        // Out-of-range input clamps instead of wrapping.
        assert_eq!(i16::from_le_bytes([bytes[6], bytes[7]]), i16::MAX);
    }

    #[test]
    fn test_wav_stream_header_shape() {
        let header = wav_stream_header(16000);
        assert_eq!(header.len(), 44);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[4..8], &u32::MAX.to_le_bytes());
        assert_eq!(&header[40..44], &u32::MAX.to_le_bytes());
        // Sample rate lands at offset 24 in the fmt chunk.
        assert_eq!(&header[24..28], &16000u32.to_le_bytes());
    }
}
