#![forbid(unsafe_code)]

//! talentflow - applicant-tracking dashboard over an optimistic local cache.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tf_core::{JobStatus, Stage};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_STORAGE_DIR: &str = ".talentflow";
const ENV_STORAGE_DIR: &str = "TALENTFLOW_STORAGE_DIR";

#[derive(Parser, Debug)]
#[command(name = "talentflow")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding talentflow.db (falls back to $TALENTFLOW_STORAGE_DIR)
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill an empty database with sample jobs and candidates
    Seed {
        #[arg(long, default_value_t = 25)]
        jobs: usize,
        #[arg(long, default_value_t = 1000)]
        candidates: usize,
        /// RNG seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List jobs in board order
    Jobs {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, value_parser = parse_status)]
        status: Option<JobStatus>,
    },

    /// Create a job
    CreateJob {
        #[arg(long)]
        title: String,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Move a job to a zero-based position on the board
    MoveJob { id: String, index: usize },

    /// Archive an open or closed job, or reopen an archived one
    Archive { id: String },

    /// List candidates
    Candidates {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, value_parser = parse_stage)]
        stage: Option<Stage>,
        /// Group into kanban columns
        #[arg(long)]
        board: bool,
    },

    /// Move a candidate to another pipeline stage
    Stage {
        candidate: String,
        #[arg(value_parser = parse_stage)]
        stage: Stage,
    },

    /// Show a candidate's timeline, newest first
    Timeline { candidate: String },

    /// Append a note to a candidate's timeline
    Note { candidate: String, text: String },

    /// Delete a note from a candidate's timeline
    DeleteNote { candidate: String, note: String },
}

fn parse_status(raw: &str) -> Result<JobStatus, String> {
    JobStatus::parse(raw).ok_or_else(|| format!("unknown job status: {raw}"))
}

fn parse_stage(raw: &str) -> Result<Stage, String> {
    Stage::parse(raw).ok_or_else(|| format!("unknown stage: {raw}"))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn resolve_storage_dir(flag: Option<PathBuf>, env: Option<String>) -> PathBuf {
    flag.or_else(|| env.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR))
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let storage_dir = resolve_storage_dir(cli.storage_dir, env_var(ENV_STORAGE_DIR));

    match commands::run(&storage_dir, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("talentflow: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests;
