//! Daemon error types.

use std::fmt;

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;

/// Errors that can occur in the daemon.
#[derive(Debug)]
pub enum DaemonError {
    /// Configuration error.
    Config(String),
    /// Announcement feed error.
    Feed(String),
    /// Calendar backend error.
    Calendar(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for DaemonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Feed(msg) => write!(f, "feed error: {}", msg),
            Self::Calendar(msg) => write!(f, "calendar error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for DaemonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DaemonError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<hqpeaks_calendar::CalendarError> for DaemonError {
    fn from(err: hqpeaks_calendar::CalendarError) -> Self {
        Self::Calendar(err.to_string())
    }
}

impl From<hqpeaks_sync::SyncError> for DaemonError {
    fn from(err: hqpeaks_sync::SyncError) -> Self {
        Self::Calendar(err.to_string())
    }
}
