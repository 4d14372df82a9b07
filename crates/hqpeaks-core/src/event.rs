//! Peak event types.
//!
//! This module provides the core value types for peak-pricing windows:
//! - [`PeakEvent`]: one immutable event window plus derived periods
//! - [`TimeSlot`]: the coarse AM/PM slot an event occupies
//! - [`Criticality`]: how criticality was established at construction
//! - [`TimeWindow`]: a half-open `[start, end)` interval

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::EventError;
use crate::rate::Rate;

/// Reference timezone for all peak events (Hydro-Québec territory).
pub const REFERENCE_TZ: Tz = chrono_tz::America::Toronto;

/// Offer-code prefix that marks a row as critical in legacy feed data.
const LEGACY_CRITICAL_PREFIX: &str = "crit";

/// The coarse daily slot a peak occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    /// Morning slot: start hour < 12.
    Am,
    /// Evening slot: start hour >= 12.
    Pm,
}

impl TimeSlot {
    /// Derives the slot from a start instant in the reference timezone.
    pub fn from_start(start: DateTime<Tz>) -> Self {
        if start.hour() < 12 { Self::Am } else { Self::Pm }
    }
}

/// How an event's criticality was established.
///
/// Resolved to a plain boolean at construction and never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criticality {
    /// The event came from the announcement feed; always critical.
    AnnouncedCritical,
    /// The event came from the generated fallback schedule.
    GeneratedNonCritical,
    /// Legacy feed row: criticality inferred from the offer-code prefix.
    LegacyInferred { offer_code_prefix_matches: bool },
}

impl Criticality {
    /// Builds the legacy variant from an offer code.
    pub fn legacy_from_offer(offer: &str) -> Self {
        Self::LegacyInferred {
            offer_code_prefix_matches: offer
                .to_ascii_lowercase()
                .starts_with(LEGACY_CRITICAL_PREFIX),
        }
    }

    /// Resolves to the stored boolean.
    pub fn resolve(&self) -> bool {
        match self {
            Self::AnnouncedCritical => true,
            Self::GeneratedNonCritical => false,
            Self::LegacyInferred {
                offer_code_prefix_matches,
            } => *offer_code_prefix_matches,
        }
    }
}

/// A half-open `[start, end)` time interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl TimeWindow {
    /// Creates a new window.
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self { start, end }
    }

    /// Returns true if `instant` falls inside `[start, end)`.
    pub fn contains(&self, instant: DateTime<Tz>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Returns the window length in minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// An anchor period before a winter-credits peak.
///
/// The anchor is a notification window used by automations; it inherits
/// the peak's criticality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorWindow {
    pub window: TimeWindow,
    pub is_critical: bool,
}

/// One immutable peak event window.
///
/// Instants are timezone-aware by construction; the derived slot,
/// preheat window, and anchor window are pure functions of the stored
/// fields and carry no state of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeakEvent {
    /// Event start (timezone-aware, reference timezone).
    pub start: DateTime<Tz>,
    /// Event end; always after `start`.
    pub end: DateTime<Tz>,
    /// Criticality, fixed at construction.
    pub is_critical: bool,
    /// True when the event came from the generated fallback schedule.
    /// Generated placeholders never expose an anchor window.
    pub is_generated: bool,
    /// The rate this event belongs to.
    pub rate: Rate,
    /// Preheat duration in minutes.
    pub preheat_minutes: i64,
    /// Client sector reported by the feed (e.g. "Résidentiel").
    pub sector: String,
}

impl PeakEvent {
    /// Creates a new peak event.
    ///
    /// Rejects windows where `end` is not after `start`. Criticality is
    /// resolved from the tri-state marker here and never recomputed.
    pub fn new(
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        criticality: Criticality,
        rate: Rate,
        preheat_minutes: i64,
    ) -> Result<Self, EventError> {
        if end <= start {
            return Err(EventError::InvalidWindow {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self {
            start,
            end,
            is_critical: criticality.resolve(),
            is_generated: matches!(criticality, Criticality::GeneratedNonCritical),
            rate,
            preheat_minutes,
            sector: "Résidentiel".to_string(),
        })
    }

    /// Creates an event recovered from calendar wire text.
    ///
    /// The mirror reads an explicit criticality marker rather than a
    /// construction-time tri-state; parsed events are never treated as
    /// generated placeholders, so non-critical parsed peaks keep their
    /// anchor windows.
    pub fn parsed(
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        is_critical: bool,
        rate: Rate,
        preheat_minutes: i64,
    ) -> Result<Self, EventError> {
        let criticality = if is_critical {
            Criticality::AnnouncedCritical
        } else {
            Criticality::LegacyInferred {
                offer_code_prefix_matches: false,
            }
        };
        Self::new(start, end, criticality, rate, preheat_minutes)
    }

    /// Localizes naive wall-clock instants in the reference timezone.
    ///
    /// Used by the calendar parse path, where backends may return naive
    /// datetimes. Ambiguous or skipped local times (DST transitions)
    /// resolve to the earliest valid instant.
    pub fn from_naive_local(
        start: NaiveDateTime,
        end: NaiveDateTime,
        criticality: Criticality,
        rate: Rate,
        preheat_minutes: i64,
    ) -> Result<Self, EventError> {
        let localize = |naive: NaiveDateTime| {
            REFERENCE_TZ
                .from_local_datetime(&naive)
                .earliest()
                .ok_or_else(|| EventError::malformed(format!("unrepresentable local time {naive}")))
        };
        Self::new(localize(start)?, localize(end)?, criticality, rate, preheat_minutes)
    }

    /// The coarse AM/PM slot this event occupies.
    pub fn time_slot(&self) -> TimeSlot {
        TimeSlot::from_start(self.start)
    }

    /// The `(date, slot)` key used by the merge algorithm.
    pub fn slot_key(&self) -> (NaiveDate, TimeSlot) {
        (self.start.date_naive(), self.time_slot())
    }

    /// The preheat window `[start − preheat, start)`.
    pub fn preheat_window(&self) -> TimeWindow {
        TimeWindow::new(self.start - Duration::minutes(self.preheat_minutes), self.start)
    }

    /// The anchor window, meaningful for the winter-credits rate only.
    ///
    /// Morning peaks anchor at `[start−5h, start−2h)`, evening peaks at
    /// `[start−4h, start−2h)`; the window inherits the peak's
    /// criticality. Generated fallback placeholders carry no anchor.
    pub fn anchor_window(&self) -> Option<AnchorWindow> {
        if !self.rate.supports_anchor() || self.is_generated {
            return None;
        }
        let lead = match self.time_slot() {
            TimeSlot::Am => Duration::hours(5),
            TimeSlot::Pm => Duration::hours(4),
        };
        Some(AnchorWindow {
            window: TimeWindow::new(self.start - lead, self.start - Duration::hours(2)),
            is_critical: self.is_critical,
        })
    }

    /// Returns true if `instant` falls inside the event window.
    pub fn contains(&self, instant: DateTime<Tz>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Serde helpers for instants in the reference timezone.
///
/// `DateTime<Tz>` carries a named timezone and has no Deserialize impl;
/// wire values are RFC 3339 strings with a numeric offset, normalized
/// into [`REFERENCE_TZ`] on the way in.
pub mod tz_datetime {
    use chrono::DateTime;
    use chrono_tz::Tz;
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::REFERENCE_TZ;

    pub fn serialize<S: Serializer>(dt: &DateTime<Tz>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Tz>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let fixed = DateTime::parse_from_rfc3339(&raw).map_err(de::Error::custom)?;
        Ok(fixed.with_timezone(&REFERENCE_TZ))
    }
}
