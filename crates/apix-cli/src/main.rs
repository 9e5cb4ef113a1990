mod cli;
mod commands;
mod error;
mod output;

use std::process::ExitCode;

use apix_core::{ApiConnector, ConnectorConfig};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    if matches!(cli.command, Command::Tables) {
        init_tracing("info");
        return commands::list_tables(cli.pretty);
    }

    let config = load_config(&cli)?;
    init_tracing(&config.log_level);
    let connector = ApiConnector::new(config);
    commands::run(&cli, &connector).await
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();
}

fn load_config(cli: &Cli) -> Result<ConnectorConfig, CliError> {
    let config = match &cli.config {
        Some(path) => ConnectorConfig::from_file_with_env(path)?,
        None => ConnectorConfig::from_env()?,
    };
    Ok(config)
}
