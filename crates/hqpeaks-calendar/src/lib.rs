//! Calendar backends and the calendar-backed peak mirror

pub mod error;
pub mod memory;
pub mod peaks;
pub mod provider;

pub use error::{CalendarError, CalendarErrorCode, CalendarResult};
pub use memory::InMemoryCalendar;
pub use peaks::CalendarPeakHandler;
pub use provider::{BoxFuture, CalendarEntry, CalendarProvider, EventDraft};
