//! Error types for the sync engine.

use hqpeaks_calendar::CalendarError;
use thiserror::Error;

/// An error raised while synchronizing peaks to the calendar.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The calendar backend rejected an operation.
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// The UID store could not be read or written.
    #[error("uid store: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SyncError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    pub fn store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Convenience alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        let err = SyncError::store("corrupt file");
        assert_eq!(err.to_string(), "uid store: corrupt file");
    }

    #[test]
    fn calendar_error_converts() {
        let err: SyncError = CalendarError::query("backend down").into();
        assert!(matches!(err, SyncError::Calendar(_)));
    }
}
