use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "voxscore")]
#[command(about = "Record and submit your daily voice clip for scoring", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Record from the microphone and submit the clip for scoring
    Record(RecordCliArgs),
    /// Submit an existing audio file for scoring
    Submit(SubmitCliArgs),
    /// Show recent submissions and their scores
    History(HistoryCliArgs),
    /// Query the running service's status
    Status(StatusCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct RecordCliArgs {
    /// Recording limit in seconds (default: from config, 60)
    #[arg(short, long)]
    pub duration: Option<u64>,
    /// Also save the recording to this path
    #[arg(long)]
    pub keep: Option<PathBuf>,
    /// Override the scoring server base URL
    #[arg(long)]
    pub api_url: Option<String>,
    /// Overwrite today's entry without asking
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(ClapArgs, Debug)]
pub struct SubmitCliArgs {
    /// Audio file to submit
    pub file: PathBuf,
    /// Override the scoring server base URL
    #[arg(long)]
    pub api_url: Option<String>,
    /// Overwrite today's entry without asking
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(ClapArgs, Debug)]
pub struct HistoryCliArgs {
    /// Maximum number of submissions to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

#[derive(ClapArgs, Debug)]
pub struct StatusCliArgs {
    /// Control API port of the running service (default: from config)
    #[arg(long)]
    pub port: Option<u16>,
}
