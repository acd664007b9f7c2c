//! CLI handler for one-shot recording and submission.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::capture::{CaptureLimits, CaptureSession, CaptureStatusHandle, MicCaptureDevice};
use crate::cli::args::RecordCliArgs;
use crate::cli::submit::run_submission;
use crate::config::Config;

/// Handle the `record` command: capture until Enter (or the limit), then
/// submit the clip.
pub async fn handle_record_command(args: RecordCliArgs) -> Result<()> {
    let config = Config::load()?;

    let max_duration = args.duration.unwrap_or(config.capture.max_duration_seconds);
    let device = Arc::new(MicCaptureDevice::new(config.capture.sample_rate));
    let status = CaptureStatusHandle::default();
    let session = CaptureSession::new(
        device,
        CaptureLimits {
            max_duration: Duration::from_secs(max_duration),
        },
        status.clone(),
    );

    let mut outcome_rx = session.start().await?;
    println!("Recording — press Enter to stop (auto-stops after {max_duration}s).");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut ticker = tokio::time::interval(Duration::from_millis(250));

    let outcome = loop {
        tokio::select! {
            outcome = &mut outcome_rx => break outcome,
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(_)) => {
                        let _ = session.stop().await;
                    }
                    _ => stdin_open = false,
                }
            }
            _ = ticker.tick() => {
                let current = status.get().await;
                let text = current.elapsed_text();
                if !text.is_empty() {
                    eprint!("\r{text} ");
                }
            }
        }
    };
    eprintln!();

    let artifact = outcome
        .map_err(|_| anyhow!("capture ended without reporting an outcome"))??;

    if let Some(path) = &args.keep {
        tokio::fs::write(path, artifact.bytes())
            .await
            .with_context(|| format!("Failed to save recording to {path:?}"))?;
        println!("Saved recording to {path:?}");
    }

    let duration = status.get().await.elapsed_seconds as i64;
    run_submission(&config, args.api_url, args.yes, artifact, Some(duration)).await
}
