use crate::global;
use crate::submission::ConflictPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub capture: CaptureConfig,
    pub submission: SubmissionConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the scoring server.
    pub base_url: String,
    /// Dashboard URL opened after a successful score. Defaults to
    /// `{base_url}/dashboard`.
    pub dashboard_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            dashboard_url: None,
        }
    }
}

impl ServerConfig {
    pub fn dashboard_url(&self) -> String {
        self.dashboard_url.clone().unwrap_or_else(|| {
            format!("{}/dashboard", self.base_url.trim_end_matches('/'))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Mono capture rate in Hz.
    pub sample_rate: u32,
    /// Hard recording limit in seconds.
    pub max_duration_seconds: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            max_duration_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    /// How long the score stays on screen before the dashboard opens.
    pub redirect_delay_ms: u64,
    /// What to do when the server reports a same-day conflict.
    pub on_conflict: ConflictPolicy,
    /// Open the dashboard in a browser after a successful score.
    pub open_dashboard: bool,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1500,
            max_poll_attempts: 20,
            redirect_delay_ms: 800,
            on_conflict: ConflictPolicy::Ask,
            open_dashboard: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Port for the local control API.
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3746 }
    }
}

impl Config {
    /// Load from `{config_dir}/voxscore/config.toml`; defaults when absent.
    pub fn load() -> Result<Self> {
        let path = global::config_file()?;
        if !path.exists() {
            info!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {path:?}"))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {path:?}"))?;
        Ok(config)
    }
}
