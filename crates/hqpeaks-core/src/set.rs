//! Event sets and the two-source schedule merge.
//!
//! An [`EventSet`] is an ordered snapshot of peak events, rebuilt
//! wholesale on every refresh. [`PeakHandler`] merges authoritative
//! announcements with the locally generated winter-credits fallback
//! schedule; announced events always supersede generated ones for the
//! same `(date, slot)` key, never the reverse.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::event::{Criticality, PeakEvent, TimeSlot};
use crate::rate::Rate;
use crate::season::is_winter_season;

/// One row from the announcement feed.
///
/// The feed collaborator has already restricted rows to "today onward"
/// for the contract's offer codes; every announced row is critical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    #[serde(with = "crate::event::tz_datetime")]
    pub start: DateTime<Tz>,
    #[serde(with = "crate::event::tz_datetime")]
    pub end: DateTime<Tz>,
    pub offer: String,
    pub sector: String,
}

/// An ordered snapshot of peak events, ascending by start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSet {
    events: Vec<PeakEvent>,
}

impl EventSet {
    /// Builds a set from unordered events, sorting by start.
    pub fn from_events(mut events: Vec<PeakEvent>) -> Self {
        events.sort_by_key(|e| e.start);
        Self { events }
    }

    /// Merges announced events with generated fallback events.
    ///
    /// Precedence is one-directional: a generated event is dropped when
    /// an announced event already covers its `(date, slot)` key. Two
    /// announced events on the same key are both kept; the feed contract
    /// does not define a tie-break and this subsystem never discards
    /// announced data.
    pub fn merge(announced: Vec<PeakEvent>, generated: Vec<PeakEvent>) -> Self {
        let mut covered: HashSet<(NaiveDate, TimeSlot)> = HashSet::new();
        for event in &announced {
            if !covered.insert(event.slot_key()) {
                warn!(
                    start = %event.start,
                    "two announced events share the same (date, slot) key; keeping both"
                );
            }
        }

        let mut merged = announced;
        merged.extend(
            generated
                .into_iter()
                .filter(|g| !covered.contains(&g.slot_key())),
        );
        Self::from_events(merged)
    }

    /// Returns the ordered events.
    pub fn events(&self) -> &[PeakEvent] {
        &self.events
    }

    /// Iterates over the critical events.
    pub fn critical(&self) -> impl Iterator<Item = &PeakEvent> {
        self.events.iter().filter(|e| e.is_critical)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Generates the winter-credits fallback schedule for `today`.
///
/// During the winter season the rate carries a fixed daily schedule:
/// AM peak 06:00-10:00, PM peak 16:00-20:00, for today and tomorrow,
/// all non-critical. Returns an empty list when `today` is out of
/// season; generated days are not themselves season-filtered, so a
/// Mar 31 query still yields the Apr 1 pair.
pub fn fallback_schedule(today: NaiveDate, preheat_minutes: i64) -> Vec<PeakEvent> {
    if !is_winter_season(today) {
        debug!(%today, "outside winter season, no fallback schedule generated");
        return Vec::new();
    }

    let slots = [
        (NaiveTime::from_hms_opt(6, 0, 0), NaiveTime::from_hms_opt(10, 0, 0)),
        (NaiveTime::from_hms_opt(16, 0, 0), NaiveTime::from_hms_opt(20, 0, 0)),
    ];

    let mut generated = Vec::with_capacity(4);
    for day_offset in 0..2i64 {
        let date = today + Duration::days(day_offset);
        for (start, end) in slots {
            let (start, end) = (start.expect("valid time"), end.expect("valid time"));
            match PeakEvent::from_naive_local(
                date.and_time(start),
                date.and_time(end),
                Criticality::GeneratedNonCritical,
                Rate::WinterCredits,
                preheat_minutes,
            ) {
                Ok(event) => generated.push(event),
                Err(err) => warn!(%date, error = %err, "skipping unrepresentable fallback slot"),
            }
        }
    }
    generated
}

/// Merges announcements with the fallback schedule for one rate.
///
/// Holds the current [`EventSet`]; the set is replaced wholesale on
/// every load so readers always observe a fully-built snapshot.
#[derive(Debug, Clone)]
pub struct PeakHandler {
    rate: Rate,
    preheat_minutes: i64,
    events: EventSet,
}

impl PeakHandler {
    /// Creates a handler with an empty event set.
    pub fn new(rate: Rate, preheat_minutes: i64) -> Self {
        Self {
            rate,
            preheat_minutes,
            events: EventSet::default(),
        }
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }

    pub fn preheat_minutes(&self) -> i64 {
        self.preheat_minutes
    }

    /// The current event snapshot.
    pub fn events(&self) -> &EventSet {
        &self.events
    }

    /// Rebuilds the event set from announcement rows.
    ///
    /// Announced rows are forced critical. For the winter-credits rate
    /// the generated fallback schedule fills the slots no announcement
    /// covers; every other rate passes announcements through unchanged.
    /// Malformed rows are dropped individually and the rest of the batch
    /// proceeds.
    pub fn load_announcements(&mut self, rows: Vec<Announcement>, today: NaiveDate) {
        let mut announced = Vec::with_capacity(rows.len());
        for row in rows {
            match PeakEvent::new(
                row.start,
                row.end,
                Criticality::AnnouncedCritical,
                self.rate,
                self.preheat_minutes,
            ) {
                Ok(mut event) => {
                    event.sector = row.sector;
                    announced.push(event);
                }
                Err(err) => {
                    warn!(offer = %row.offer, error = %err, "dropping malformed announcement");
                }
            }
        }

        let set = if self.rate.has_fallback_schedule() {
            let generated = fallback_schedule(today, self.preheat_minutes);
            let announced_count = announced.len();
            let merged = EventSet::merge(announced, generated);
            debug!(
                rate = %self.rate,
                announced = announced_count,
                generated = merged.len() - announced_count,
                total = merged.len(),
                "rebuilt event set"
            );
            merged
        } else {
            let set = EventSet::from_events(announced);
            debug!(rate = %self.rate, total = set.len(), "rebuilt event set (all critical)");
            set
        };

        if let (Some(first), Some(last)) = (
            set.critical().map(|e| e.start).min(),
            set.critical().map(|e| e.start).max(),
        ) {
            debug!(rate = %self.rate, %first, %last, "critical peak range");
        }

        self.events = set;
    }
}
