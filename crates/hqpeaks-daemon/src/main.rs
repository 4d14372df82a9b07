//! hqpeaksd entry point.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::Level;

use hqpeaks_core::{TracingConfig, TracingOutputFormat, init_tracing};
use hqpeaks_daemon::cli::Cli;
use hqpeaks_daemon::config::DaemonConfig;
use hqpeaks_daemon::error::{DaemonError, DaemonResult};
use hqpeaks_daemon::Daemon;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.log_level.parse::<Level>() {
        Ok(level) => level,
        Err(_) => {
            eprintln!("error: invalid log level '{}'", cli.log_level);
            return ExitCode::FAILURE;
        }
    };
    // Compact lines for one-shot runs, JSON for the long-running loop.
    let tracing_config = if cli.once {
        TracingConfig::default()
            .with_level(level)
            .with_format(TracingOutputFormat::Compact)
    } else {
        TracingConfig::daemon().with_level(level)
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> DaemonResult<()> {
    let config = if let Some(ref path) = cli.config {
        DaemonConfig::load_from(path)?
    } else {
        DaemonConfig::load()?
    };

    if cli.interval == 0 {
        return Err(DaemonError::Config("interval must be positive".to_string()));
    }

    let mut daemon = Daemon::new(config, cli.dry_run).await?;
    daemon
        .run(Duration::from_secs(cli.interval), cli.once)
        .await
}
