//! Post-score hook.
//!
//! When a job finishes with a score the workflow's terminal action is to
//! send the user to their results, after a short delay so the score text is
//! visible. Hook failures log a warning and never affect the outcome.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

/// Runs once after a submission reaches Finished.
#[async_trait]
pub trait ResultsHook: Send + Sync {
    async fn on_scored(&self, score: Option<f64>) -> Result<()>;
}

/// Opens the dashboard in the user's browser via the platform opener.
pub struct DashboardRedirect {
    url: String,
}

impl DashboardRedirect {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    fn opener() -> Result<std::path::PathBuf> {
        for candidate in ["xdg-open", "open"] {
            if let Ok(path) = which::which(candidate) {
                return Ok(path);
            }
        }
        anyhow::bail!("no URL opener found (tried xdg-open, open)")
    }
}

#[async_trait]
impl ResultsHook for DashboardRedirect {
    async fn on_scored(&self, score: Option<f64>) -> Result<()> {
        if let Some(score) = score {
            info!("Opening dashboard after scoring ({})", score);
        } else {
            info!("Opening dashboard after scoring");
        }

        let opener = Self::opener()?;
        let status = tokio::process::Command::new(opener)
            .arg(&self.url)
            .status()
            .await
            .context("Failed to launch URL opener")?;

        if !status.success() {
            warn!("URL opener exited with {}", status);
        }
        Ok(())
    }
}
