//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// hqpeaksd - Hydro-Québec peak events in your calendar
#[derive(Debug, Parser)]
#[command(name = "hqpeaksd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "HQPEAKS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run a single refresh cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Seconds between refresh cycles
    #[arg(long, default_value = "300")]
    pub interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Refresh the event state without writing to the calendar
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["hqpeaksd"]);
        assert!(!cli.once);
        assert_eq!(cli.interval, 300);
        assert_eq!(cli.log_level, "info");
        assert!(!cli.dry_run);
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::parse_from([
            "hqpeaksd",
            "--once",
            "--interval",
            "60",
            "--log-level",
            "debug",
            "--dry-run",
        ]);
        assert!(cli.once);
        assert_eq!(cli.interval, 60);
        assert_eq!(cli.log_level, "debug");
        assert!(cli.dry_run);
    }
}
