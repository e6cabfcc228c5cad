//! ABOUTME: Entry point for the forgeflow CLI
//! ABOUTME: parses arguments, sets up tracing, and dispatches to one of the three modes

use anyhow::Result;
use clap::Parser;
use forgeflow_cli::cli::{Cli, Command, LogLevel};
use forgeflow_cli::commands::{client, service, workflow};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match &cli.command {
        Command::Workflow(args) => args.log,
        _ => LogLevel::Normal,
    };
    setup_tracing(log_level);

    let exit_code = match cli.command {
        Command::Workflow(args) => workflow::run(args).await?,
        Command::Service(args) => {
            service::run(args).await?;
            0
        }
        Command::Client(args) => client::run(args).await?,
    };

    std::process::exit(exit_code);
}

/// Priority: `RUST_LOG` > `--log` flag.
fn setup_tracing(log_level: LogLevel) {
    use std::io;
    use tracing_subscriber::EnvFilter;

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    } else {
        let level: tracing::Level = log_level.into();
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    }
}
