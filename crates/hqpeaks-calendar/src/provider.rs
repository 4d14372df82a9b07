//! CalendarProvider trait definition.
//!
//! The core abstraction over the external calendar store. Backends only
//! offer plain text fields and single-event writes; there is no batch
//! write and no custom-metadata field, which is why event identity
//! travels inside the description text (see `hqpeaks_core::marker`).

use std::future::Future;
use std::pin::Pin;

use chrono::DateTime;
use chrono_tz::Tz;
use hqpeaks_core::TimeWindow;

use crate::error::CalendarResult;

/// A boxed future for async trait methods.
///
/// Keeps the trait object-safe for dynamic dispatch across backends.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One entry returned by a calendar query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub summary: String,
    pub description: String,
}

/// A new event to write into a calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub summary: String,
    pub description: String,
    pub location: String,
}

/// The capability surface of an external calendar store.
///
/// Implementations must be `Send + Sync`; all methods absorb transient
/// backend failures into [`crate::CalendarError`] rather than panicking.
pub trait CalendarProvider: Send + Sync {
    /// A short backend name for logging ("memory", "homeassistant", ...).
    fn name(&self) -> &str;

    /// Whether the target calendar exists and is ready for use.
    fn calendar_exists<'a>(&'a self, calendar_id: &'a str) -> BoxFuture<'a, CalendarResult<bool>>;

    /// The display name of the calendar, for attribution.
    fn calendar_name<'a>(&'a self, calendar_id: &'a str) -> BoxFuture<'a, CalendarResult<String>>;

    /// Lists entries overlapping the window.
    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, CalendarResult<Vec<CalendarEntry>>>;

    /// Creates one event. No batch capability exists.
    fn create_event<'a>(
        &'a self,
        calendar_id: &'a str,
        draft: EventDraft,
    ) -> BoxFuture<'a, CalendarResult<()>>;
}
