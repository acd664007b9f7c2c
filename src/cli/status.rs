//! CLI handler for querying the running service.

use anyhow::{Context, Result};

use crate::cli::args::StatusCliArgs;
use crate::config::Config;

pub async fn handle_status_command(args: StatusCliArgs) -> Result<()> {
    let config = Config::load()?;
    let port = args.port.unwrap_or(config.api.port);
    let url = format!("http://127.0.0.1:{port}/status");

    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("Is the voxscore service running on port {port}?"))?;
    let body: serde_json::Value = response
        .json()
        .await
        .context("Failed to parse status response")?;

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
