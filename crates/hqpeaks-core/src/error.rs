//! Core error types.

use thiserror::Error;

/// Errors raised while constructing or loading peak events.
#[derive(Debug, Error)]
pub enum EventError {
    /// The event window is empty or inverted.
    #[error("invalid event window: end {end} not after start {start}")]
    InvalidWindow { start: String, end: String },

    /// The rate code is not one of the modeled dynamic rates.
    #[error("unknown rate code: {code}")]
    UnknownRate { code: String },

    /// A feed row could not be interpreted as a peak event.
    #[error("malformed announcement: {reason}")]
    MalformedAnnouncement { reason: String },
}

impl EventError {
    /// Creates a malformed-announcement error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedAnnouncement {
            reason: reason.into(),
        }
    }
}
