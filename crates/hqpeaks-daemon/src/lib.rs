//! Daemon wiring: CLI, config, feed reader and refresh loop

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod feed;

pub use app::Daemon;
pub use cli::Cli;
pub use config::DaemonConfig;
pub use error::{DaemonError, DaemonResult};
