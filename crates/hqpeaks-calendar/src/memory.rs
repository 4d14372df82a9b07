//! In-memory calendar backend.
//!
//! Backs the daemon's dry-run mode and the workspace test suites. The
//! backend can be told to fail reads or writes to exercise the error
//! paths of its callers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use hqpeaks_core::TimeWindow;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{CalendarError, CalendarResult};
use crate::provider::{BoxFuture, CalendarEntry, CalendarProvider, EventDraft};

#[derive(Debug, Default)]
struct CalendarData {
    display_name: String,
    entries: Vec<CalendarEntry>,
}

/// A calendar store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryCalendar {
    calendars: RwLock<HashMap<String, CalendarData>>,
    fail_queries: AtomicBool,
    fail_creates: AtomicBool,
    created: AtomicUsize,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a calendar under the given id.
    pub async fn add_calendar(&self, calendar_id: impl Into<String>, display_name: impl Into<String>) {
        self.calendars.write().await.insert(
            calendar_id.into(),
            CalendarData {
                display_name: display_name.into(),
                entries: Vec::new(),
            },
        );
    }

    /// Inserts an entry directly, bypassing `create_event` accounting.
    pub async fn seed_entry(&self, calendar_id: &str, entry: CalendarEntry) {
        if let Some(data) = self.calendars.write().await.get_mut(calendar_id) {
            data.entries.push(entry);
        }
    }

    /// Removes every entry from a calendar, keeping the calendar itself.
    pub async fn clear_entries(&self, calendar_id: &str) {
        if let Some(data) = self.calendars.write().await.get_mut(calendar_id) {
            data.entries.clear();
        }
    }

    /// Makes subsequent queries fail until reset.
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent writes fail until reset.
    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `create_event` calls.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Entries currently stored for a calendar.
    pub async fn entries(&self, calendar_id: &str) -> Vec<CalendarEntry> {
        self.calendars
            .read()
            .await
            .get(calendar_id)
            .map(|d| d.entries.clone())
            .unwrap_or_default()
    }
}

impl CalendarProvider for InMemoryCalendar {
    fn name(&self) -> &str {
        "memory"
    }

    fn calendar_exists<'a>(&'a self, calendar_id: &'a str) -> BoxFuture<'a, CalendarResult<bool>> {
        Box::pin(async move { Ok(self.calendars.read().await.contains_key(calendar_id)) })
    }

    fn calendar_name<'a>(&'a self, calendar_id: &'a str) -> BoxFuture<'a, CalendarResult<String>> {
        Box::pin(async move {
            self.calendars
                .read()
                .await
                .get(calendar_id)
                .map(|d| d.display_name.clone())
                .ok_or_else(|| {
                    CalendarError::not_found(format!("calendar {calendar_id} not registered"))
                        .with_backend("memory")
                })
        })
    }

    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, CalendarResult<Vec<CalendarEntry>>> {
        Box::pin(async move {
            if self.fail_queries.load(Ordering::SeqCst) {
                return Err(CalendarError::query("injected query failure").with_backend("memory"));
            }
            let calendars = self.calendars.read().await;
            let data = calendars.get(calendar_id).ok_or_else(|| {
                CalendarError::not_found(format!("calendar {calendar_id} not registered"))
                    .with_backend("memory")
            })?;
            // Overlap, not containment: entries straddling the window
            // bounds are still returned.
            let hits = data
                .entries
                .iter()
                .filter(|e| e.start < window.end && e.end > window.start)
                .cloned()
                .collect();
            Ok(hits)
        })
    }

    fn create_event<'a>(
        &'a self,
        calendar_id: &'a str,
        draft: EventDraft,
    ) -> BoxFuture<'a, CalendarResult<()>> {
        Box::pin(async move {
            if self.fail_creates.load(Ordering::SeqCst) {
                return Err(CalendarError::create("injected create failure").with_backend("memory"));
            }
            let mut calendars = self.calendars.write().await;
            let data = calendars.get_mut(calendar_id).ok_or_else(|| {
                CalendarError::not_found(format!("calendar {calendar_id} not registered"))
                    .with_backend("memory")
            })?;
            debug!(calendar = calendar_id, summary = %draft.summary, "storing event");
            data.entries.push(CalendarEntry {
                start: draft.start,
                end: draft.end,
                summary: draft.summary,
                description: draft.description,
            });
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz;
    use hqpeaks_core::REFERENCE_TZ;

    fn local(d: u32, h: u32) -> chrono::DateTime<Tz> {
        REFERENCE_TZ.with_ymd_and_hms(2024, 12, d, h, 0, 0).unwrap()
    }

    fn draft(d: u32, start_h: u32, end_h: u32) -> EventDraft {
        EventDraft {
            start: local(d, start_h),
            end: local(d, end_h),
            summary: "test".to_string(),
            description: "test".to_string(),
            location: String::new(),
        }
    }

    #[tokio::test]
    async fn create_and_list() {
        let cal = InMemoryCalendar::new();
        cal.add_calendar("peaks", "Peaks").await;
        cal.create_event("peaks", draft(15, 16, 20)).await.unwrap();

        let window = TimeWindow::new(local(15, 0), local(16, 0));
        let hits = cal.list_events("peaks", window).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(cal.created_count(), 1);
    }

    #[tokio::test]
    async fn window_overlap_semantics() {
        let cal = InMemoryCalendar::new();
        cal.add_calendar("peaks", "Peaks").await;
        cal.create_event("peaks", draft(15, 16, 20)).await.unwrap();

        // Window ends inside the event: still a hit.
        let hits = cal
            .list_events("peaks", TimeWindow::new(local(15, 0), local(15, 17)))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        // Disjoint window: no hit.
        let hits = cal
            .list_events("peaks", TimeWindow::new(local(16, 0), local(17, 0)))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn unknown_calendar_errors() {
        let cal = InMemoryCalendar::new();
        assert!(!cal.calendar_exists("nope").await.unwrap());
        assert!(cal.calendar_name("nope").await.is_err());
        assert!(cal.create_event("nope", draft(15, 16, 20)).await.is_err());
    }

    #[tokio::test]
    async fn failure_injection() {
        let cal = InMemoryCalendar::new();
        cal.add_calendar("peaks", "Peaks").await;

        cal.set_fail_queries(true);
        let err = cal
            .list_events("peaks", TimeWindow::new(local(15, 0), local(16, 0)))
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        cal.set_fail_creates(true);
        assert!(cal.create_event("peaks", draft(15, 16, 20)).await.is_err());
        assert_eq!(cal.created_count(), 0);
    }
}
