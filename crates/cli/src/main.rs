//! smm - command line client for the SMM panel

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use config::Settings;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "smm")]
#[command(about = "Storefront and back office client for the SMM panel")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Data directory for tokens, settings and logs
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    /// Settings file (defaults to smm.toml in the data directory)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "120")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(config::default_data_dir);
    let settings = Settings::load(cli.config.as_deref(), &data_dir)?;
    let data_dir = cli
        .data_dir
        .or_else(|| settings.data_dir.clone())
        .unwrap_or(data_dir);

    logging::init_logging(cli.log_level.into(), &data_dir, cli.no_file_log)?;
    info!(api_url = %settings.api_url, "Starting smm CLI");

    let client = commands::build_client(&settings, &data_dir)?;

    let command = cli.command.execute(client);
    let outcome = if cli.timeout == 0 {
        Ok(command.await)
    } else {
        tokio::time::timeout(Duration::from_secs(cli.timeout), command).await
    };

    match outcome {
        Ok(Ok(())) => info!("Command completed successfully"),
        Ok(Err(e)) => {
            error!("Command failed: {e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
        Err(_) => {
            error!("Command timed out after {} seconds", cli.timeout);
            eprintln!("Error: timed out after {} seconds", cli.timeout);
            std::process::exit(1);
        }
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}
