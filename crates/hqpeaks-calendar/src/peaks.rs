//! Calendar-backed peak mirror.
//!
//! Rebuilds the peak query surface from calendar contents instead of a
//! live announcement feed, so state survives a process restart. Entries
//! are ours only if their description carries our UID marker; everything
//! else in the calendar is ignored.

use std::sync::Arc;

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use hqpeaks_core::{
    EventSet, PeakEvent, PeakSnapshot, Rate, TimeWindow, fallback_schedule,
    parse_description,
};
use tracing::{debug, warn};

use crate::error::{CalendarError, CalendarResult};
use crate::provider::{CalendarEntry, CalendarProvider};

/// How far ahead the mirror queries the calendar.
const LOOKAHEAD_DAYS: i64 = 7;

/// Mirrors the peak surface from an external calendar.
pub struct CalendarPeakHandler {
    provider: Arc<dyn CalendarProvider>,
    calendar_id: String,
    rate: Rate,
    preheat_minutes: i64,
    events: EventSet,
    load_failed: bool,
    last_load: Option<DateTime<Tz>>,
}

impl CalendarPeakHandler {
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        calendar_id: impl Into<String>,
        rate: Rate,
        preheat_minutes: i64,
    ) -> Self {
        Self {
            provider,
            calendar_id: calendar_id.into(),
            rate,
            preheat_minutes,
            events: EventSet::default(),
            load_failed: false,
            last_load: None,
        }
    }

    /// Refreshes the event set from the calendar.
    ///
    /// On query failure the previously loaded set stays in place and
    /// `load_failed` flips on; callers must read failure as "stale
    /// data", never as "no peaks exist". Returns the number of parsed
    /// entries on success.
    pub async fn load_events(&mut self, now: DateTime<Tz>) -> CalendarResult<usize> {
        let window = TimeWindow::new(now, now + Duration::days(LOOKAHEAD_DAYS));
        let entries = match self.provider.list_events(&self.calendar_id, window).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    calendar = %self.calendar_id,
                    error = %err,
                    "calendar query failed, keeping previous event set"
                );
                self.load_failed = true;
                return Err(err);
            }
        };

        let parsed = self.parse_entries(&entries);
        debug!(
            calendar = %self.calendar_id,
            entries = entries.len(),
            parsed = parsed.len(),
            "calendar refresh"
        );

        self.events = if self.rate.has_fallback_schedule() {
            let generated = fallback_schedule(now.date_naive(), self.preheat_minutes);
            EventSet::merge(parsed, generated)
        } else {
            EventSet::from_events(parsed)
        };
        self.load_failed = false;
        self.last_load = Some(now);
        Ok(self.events.len())
    }

    fn parse_entries(&self, entries: &[CalendarEntry]) -> Vec<PeakEvent> {
        let mut parsed = Vec::new();
        for entry in entries {
            let Some(marker) = parse_description(&entry.description) else {
                debug!(summary = %entry.summary, "skipping foreign calendar entry");
                continue;
            };
            // Only the winter-credits rate mixes criticalities; other
            // rates never mirror non-critical entries, so the marker
            // can only mean critical.
            let is_critical =
                marker.is_critical || !self.rate.has_fallback_schedule();
            let rate = marker.rate.unwrap_or(self.rate);
            match PeakEvent::parsed(entry.start, entry.end, is_critical, rate, self.preheat_minutes)
            {
                Ok(event) => parsed.push(event),
                Err(err) => {
                    warn!(uid = %marker.uid, error = %err, "dropping malformed calendar entry");
                }
            }
        }
        parsed
    }

    /// The pure classification surface over the mirrored set.
    pub fn snapshot<'a>(&'a self, now: DateTime<Tz>) -> PeakSnapshot<'a> {
        PeakSnapshot::new(now, &self.events, self.rate)
    }

    /// Display name of the bound calendar, for attribution.
    pub async fn calendar_name(&self) -> CalendarResult<String> {
        self.provider.calendar_name(&self.calendar_id).await
    }

    /// Confirms the bound calendar exists on the backend.
    pub async fn validate(&self) -> CalendarResult<()> {
        if self.provider.calendar_exists(&self.calendar_id).await? {
            Ok(())
        } else {
            Err(
                CalendarError::not_found(format!("calendar {} not found", self.calendar_id))
                    .with_backend(self.provider.name()),
            )
        }
    }

    pub fn events(&self) -> &EventSet {
        &self.events
    }

    /// Whether the most recent refresh failed.
    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    /// Instant of the last successful refresh.
    pub fn last_load(&self) -> Option<DateTime<Tz>> {
        self.last_load
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hqpeaks_core::marker::{event_uid, render_description, render_location, render_summary};
    use hqpeaks_core::{PeakState, REFERENCE_TZ};

    use crate::memory::InMemoryCalendar;
    use crate::provider::CalendarEntry;

    fn local(m: u32, d: u32, h: u32) -> DateTime<Tz> {
        REFERENCE_TZ.with_ymd_and_hms(2024, m, d, h, 0, 0).unwrap()
    }

    fn peak_entry(m: u32, d: u32, start_h: u32, end_h: u32, is_critical: bool) -> CalendarEntry {
        let start = local(m, d, start_h);
        let end = local(m, d, end_h);
        let uid = event_uid("123456789", start);
        CalendarEntry {
            start,
            end,
            summary: render_summary(is_critical).to_string(),
            description: render_description(
                &uid,
                Rate::WinterCredits,
                is_critical,
                start,
                end,
                start,
            ),
        }
    }

    fn foreign_entry(m: u32, d: u32) -> CalendarEntry {
        CalendarEntry {
            start: local(m, d, 9),
            end: local(m, d, 10),
            summary: "Dentist".to_string(),
            description: "Bring the insurance card".to_string(),
        }
    }

    async fn seeded_handler(entries: Vec<CalendarEntry>) -> (Arc<InMemoryCalendar>, CalendarPeakHandler) {
        let cal = Arc::new(InMemoryCalendar::new());
        cal.add_calendar("peaks", "Pointes Hydro").await;
        for entry in entries {
            cal.seed_entry("peaks", entry).await;
        }
        let handler =
            CalendarPeakHandler::new(cal.clone(), "peaks", Rate::WinterCredits, 180);
        (cal, handler)
    }

    #[tokio::test]
    async fn mirrors_critical_entry() {
        let (_cal, mut handler) = seeded_handler(vec![peak_entry(12, 15, 16, 20, true)]).await;
        handler.load_events(local(12, 15, 8)).await.unwrap();

        let snap = handler.snapshot(local(12, 15, 17));
        assert_eq!(snap.current_state(), PeakState::CriticalPeak);
        assert!(!handler.load_failed());
        assert_eq!(handler.last_load(), Some(local(12, 15, 8)));
    }

    #[tokio::test]
    async fn foreign_entries_are_discarded() {
        let (_cal, mut handler) = seeded_handler(vec![foreign_entry(12, 15)]).await;
        handler.load_events(local(12, 15, 8)).await.unwrap();

        // Winter date, so only the generated fallback slots remain.
        assert_eq!(handler.events().len(), 4);
        assert!(handler.events().critical().count() == 0);
    }

    #[tokio::test]
    async fn calendar_entry_displaces_generated_slot() {
        let (_cal, mut handler) = seeded_handler(vec![peak_entry(12, 15, 16, 20, true)]).await;
        handler.load_events(local(12, 15, 8)).await.unwrap();

        // Four fallback slots, one overridden by the mirrored entry.
        assert_eq!(handler.events().len(), 4);
        assert_eq!(handler.events().critical().count(), 1);
    }

    #[tokio::test]
    async fn off_season_has_no_fallback() {
        let (_cal, mut handler) = seeded_handler(vec![]).await;
        handler.load_events(local(6, 15, 8)).await.unwrap();
        assert!(handler.events().is_empty());
    }

    #[tokio::test]
    async fn dynamic_pricing_forces_critical() {
        let cal = Arc::new(InMemoryCalendar::new());
        cal.add_calendar("peaks", "Pointes Hydro").await;
        // Marker says non-critical, but the rate has no non-critical
        // mirror path.
        cal.seed_entry("peaks", peak_entry(12, 15, 16, 20, false)).await;
        let mut handler =
            CalendarPeakHandler::new(cal, "peaks", Rate::DynamicPricing, 180);
        handler.load_events(local(12, 15, 8)).await.unwrap();

        assert_eq!(handler.events().len(), 1);
        assert_eq!(handler.events().critical().count(), 1);
    }

    #[tokio::test]
    async fn query_failure_keeps_stale_set() {
        let (cal, mut handler) = seeded_handler(vec![peak_entry(12, 15, 16, 20, true)]).await;
        handler.load_events(local(12, 15, 8)).await.unwrap();
        assert_eq!(handler.events().critical().count(), 1);

        cal.set_fail_queries(true);
        assert!(handler.load_events(local(12, 15, 9)).await.is_err());
        assert!(handler.load_failed());
        // Stale but intact.
        assert_eq!(handler.events().critical().count(), 1);
        assert_eq!(handler.last_load(), Some(local(12, 15, 8)));

        cal.set_fail_queries(false);
        handler.load_events(local(12, 15, 10)).await.unwrap();
        assert!(!handler.load_failed());
    }

    #[tokio::test]
    async fn validate_checks_existence() {
        let (_cal, handler) = seeded_handler(vec![]).await;
        handler.validate().await.unwrap();

        let missing = CalendarPeakHandler::new(
            Arc::new(InMemoryCalendar::new()),
            "nope",
            Rate::WinterCredits,
            180,
        );
        assert!(missing.validate().await.is_err());
        assert_eq!(missing.calendar_name().await.ok(), None);
    }

    #[tokio::test]
    async fn attribution_surfaces() {
        let (_cal, handler) = seeded_handler(vec![]).await;
        assert_eq!(handler.calendar_name().await.unwrap(), "Pointes Hydro");
        assert_eq!(render_location(Rate::WinterCredits), "Hydro-Québec DCPC");
    }
}
