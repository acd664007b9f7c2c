use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use voxscore::{
    app,
    cli::{
        handle_history_command, handle_record_command, handle_status_command,
        handle_submit_command, Cli, CliCommand,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("voxscore {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(CliCommand::Record(args)) => {
            return handle_record_command(args).await;
        }
        Some(CliCommand::Submit(args)) => {
            return handle_submit_command(args).await;
        }
        Some(CliCommand::History(args)) => {
            return handle_history_command(args);
        }
        Some(CliCommand::Status(args)) => {
            return handle_status_command(args).await;
        }
        None => {}
    }

    app::run_service().await
}
