//! ABOUTME: CLI argument parsing — one executable, three modes
//! ABOUTME: (workflow, service, client), matching the external interface
//! ABOUTME: contract exactly

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Trace level for `workflow` mode's `--log` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Normal,
    Debug,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Normal => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "forgeflow")]
#[command(version)]
#[command(about = "LLM-driven code-refactoring workflow orchestrator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one workflow in-process.
    Workflow(WorkflowArgs),
    /// Start the HTTP service.
    Service(ServiceArgs),
    /// Submit a workflow to a running service.
    Client(ClientArgs),
}

#[derive(Args, Debug)]
pub struct WorkflowArgs {
    /// Path to the system/app TOML config.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Project directory to refactor. Defaults to the config's `project.path`.
    #[arg(long)]
    pub project_path: Option<String>,

    /// File containing the refactor intent description.
    #[arg(long)]
    pub intent_file: Option<PathBuf>,

    /// Additional config files layered over `--config`, applied in order.
    #[arg(long = "system-configs", num_args = 0..)]
    pub system_configs: Vec<PathBuf>,

    #[arg(long, value_enum, default_value = "normal")]
    pub log: LogLevel,
}

#[derive(Args, Debug)]
pub struct ServiceArgs {
    #[arg(long, default_value_t = 8000)]
    pub port: u16,
}

#[derive(Args, Debug)]
pub struct ClientArgs {
    /// Base URL of the running service, e.g. http://localhost:8000.
    #[arg(long, default_value = "http://localhost:8000")]
    pub url: String,

    #[arg(long)]
    pub project_path: String,

    #[arg(long)]
    pub intent_file: PathBuf,

    /// Poll the workflow until it reaches a terminal status.
    #[arg(long)]
    pub poll: bool,

    #[arg(long, default_value_t = 2)]
    pub poll_interval: u64,

    #[arg(long, default_value_t = 30)]
    pub max_polls: u32,
}
