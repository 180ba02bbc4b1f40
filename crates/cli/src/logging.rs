use anyhow::Result;
use smm_core::tracing::{InstrumentationConfig, init_tracing};
use std::fs::OpenOptions;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE: &str = "cli.log";

/// Initialize logging for the CLI
pub fn init_logging(log_level: Level, data_dir: &Path, no_file_log: bool) -> Result<()> {
    let level_str = level_filter(log_level);

    if no_file_log {
        // Only log to stderr
        let config = InstrumentationConfig {
            log_level: level_str,
            ..InstrumentationConfig::from_env()
        };
        init_tracing(&config)?;
        return Ok(());
    }

    init_file_logging(&level_str, data_dir)
}

fn level_filter(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    format!("smm={level},smm_http={level},smm_core={level}")
}

fn init_file_logging(filter: &str, data_dir: &Path) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    std::fs::create_dir_all(data_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(data_dir.join(LOG_FILE))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .init();

    Ok(())
}
