//! Error types for calendar backend operations.

use std::fmt;
use thiserror::Error;

/// The category of a calendar error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarErrorCode {
    /// The calendar component or the target calendar does not exist.
    NotFound,
    /// A read query against the backend failed.
    QueryFailed,
    /// A write against the backend failed.
    CreateFailed,
    /// The backend returned data we could not interpret.
    InvalidResponse,
    /// Missing or invalid configuration.
    Configuration,
    /// Unexpected internal state.
    Internal,
}

impl CalendarErrorCode {
    /// Returns true if the operation may be retried on a later cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::QueryFailed | Self::CreateFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::QueryFailed => "query_failed",
            Self::CreateFailed => "create_failed",
            Self::InvalidResponse => "invalid_response",
            Self::Configuration => "configuration",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for CalendarErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error from a calendar backend.
#[derive(Debug, Error)]
pub struct CalendarError {
    code: CalendarErrorCode,
    message: String,
    backend: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CalendarError {
    pub fn new(code: CalendarErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            backend: None,
            source: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::NotFound, message)
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::QueryFailed, message)
    }

    pub fn create(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::CreateFailed, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::InvalidResponse, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::Configuration, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CalendarErrorCode::Internal, message)
    }

    /// Sets the backend name for this error.
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Sets the source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> CalendarErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref backend) = self.backend {
            write!(f, "[{}] ", backend)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for calendar operations.
pub type CalendarResult<T> = Result<T, CalendarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_codes() {
        assert!(CalendarErrorCode::QueryFailed.is_retryable());
        assert!(CalendarErrorCode::CreateFailed.is_retryable());
        assert!(!CalendarErrorCode::NotFound.is_retryable());
        assert!(!CalendarErrorCode::Configuration.is_retryable());
    }

    #[test]
    fn display_includes_backend() {
        let err = CalendarError::query("timed out").with_backend("memory");
        let text = format!("{err}");
        assert!(text.contains("[memory]"));
        assert!(text.contains("query_failed"));
        assert!(text.contains("timed out"));
    }
}
