//! Current-state classification over an event snapshot.
//!
//! Everything here is a deterministic projection of `(now, EventSet)`
//! with zero I/O and zero mutation: production call sites supply the
//! real clock, tests supply fixed instants.

use chrono::{DateTime, Duration, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::event::{AnchorWindow, PeakEvent, TimeSlot};
use crate::season::is_winter_season;
use crate::set::EventSet;
use crate::rate::Rate;

/// The classified state of the current moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakState {
    /// Outside the winter season.
    OffSeason,
    /// Inside a critical peak window.
    CriticalPeak,
    /// Inside a non-critical peak window.
    Peak,
    /// Inside the anchor window of a critical peak (winter credits).
    CriticalAnchor,
    /// Inside the anchor window of a non-critical peak (winter credits).
    Anchor,
    /// In season, no peak or anchor active.
    Normal,
}

impl PeakState {
    /// Returns the wire name used by downstream consumers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OffSeason => "off_season",
            Self::CriticalPeak => "critical_peak",
            Self::Peak => "peak",
            Self::CriticalAnchor => "critical_anchor",
            Self::Anchor => "anchor",
            Self::Normal => "normal",
        }
    }
}

/// Which day a day-part lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Day {
    Today,
    Tomorrow,
}

/// A read-only view over `(now, EventSet)`.
///
/// Borrowed from a fully-built snapshot; never observes a partially
/// merged set.
#[derive(Debug, Clone, Copy)]
pub struct PeakSnapshot<'a> {
    now: DateTime<Tz>,
    events: &'a EventSet,
    rate: Rate,
}

impl<'a> PeakSnapshot<'a> {
    pub fn new(now: DateTime<Tz>, events: &'a EventSet, rate: Rate) -> Self {
        Self { now, events, rate }
    }

    pub fn now(&self) -> DateTime<Tz> {
        self.now
    }

    /// Classifies the current moment.
    ///
    /// Priority: off-season, then peak (by criticality), then anchor
    /// (winter credits only), then normal.
    pub fn current_state(&self) -> PeakState {
        if !is_winter_season(self.now.date_naive()) {
            return PeakState::OffSeason;
        }
        if let Some(peak) = self.current_peak() {
            return if peak.is_critical {
                PeakState::CriticalPeak
            } else {
                PeakState::Peak
            };
        }
        if self.rate.supports_anchor()
            && let Some(anchor) = self.current_anchor()
        {
            return if anchor.is_critical {
                PeakState::CriticalAnchor
            } else {
                PeakState::Anchor
            };
        }
        PeakState::Normal
    }

    /// The peak whose window contains `now`, if any.
    pub fn current_peak(&self) -> Option<&'a PeakEvent> {
        self.events.events().iter().find(|e| e.contains(self.now))
    }

    /// The anchor window containing `now`, if any (winter credits only).
    pub fn current_anchor(&self) -> Option<AnchorWindow> {
        self.events
            .events()
            .iter()
            .filter_map(|e| e.anchor_window())
            .find(|a| a.window.contains(self.now))
    }

    /// The next peak that has not yet ended.
    pub fn next_peak(&self) -> Option<&'a PeakEvent> {
        self.events
            .events()
            .iter()
            .filter(|e| e.end > self.now)
            .min_by_key(|e| e.start)
    }

    /// The next critical peak that has not yet ended.
    pub fn next_critical_peak(&self) -> Option<&'a PeakEvent> {
        self.events
            .events()
            .iter()
            .filter(|e| e.end > self.now && e.is_critical)
            .min_by_key(|e| e.start)
    }

    pub fn peak_in_progress(&self) -> bool {
        self.current_peak().is_some()
    }

    pub fn current_peak_is_critical(&self) -> bool {
        self.current_peak().is_some_and(|p| p.is_critical)
    }

    pub fn is_any_critical_peak_coming(&self) -> bool {
        self.next_critical_peak().is_some()
    }

    /// Raw preheat arithmetic: `now` inside the next peak's preheat window.
    pub fn preheat_in_progress(&self) -> bool {
        self.next_peak()
            .is_some_and(|p| p.preheat_window().contains(self.now))
    }

    /// Guarded preheat signal for automations.
    ///
    /// Reports false unless the upcoming peak is critical, even when the
    /// raw window arithmetic says true; generated winter-credits peaks
    /// must not trigger preheating.
    pub fn critical_preheat_in_progress(&self) -> bool {
        self.preheat_in_progress() && self.next_peak().is_some_and(|p| p.is_critical)
    }

    /// The upcoming preheat start, exposed only for critical peaks.
    ///
    /// Same guard as [`Self::critical_preheat_in_progress`].
    pub fn next_preheat_start(&self) -> Option<DateTime<Tz>> {
        self.next_peak()
            .filter(|p| p.is_critical)
            .map(|p| p.preheat_window().start)
    }

    /// The anchor window of the next peak (winter credits only).
    pub fn next_anchor(&self) -> Option<AnchorWindow> {
        self.next_peak().and_then(|p| p.anchor_window())
    }

    /// Day-part lookup: the peak covering the canonical slot start
    /// (06:00 for AM, 16:00 for PM) on today or tomorrow.
    pub fn peak_for_slot(&self, day: Day, slot: TimeSlot) -> Option<&'a PeakEvent> {
        let date = match day {
            Day::Today => self.now.date_naive(),
            Day::Tomorrow => self.now.date_naive() + Duration::days(1),
        };
        let hour = match slot {
            TimeSlot::Am => 6,
            TimeSlot::Pm => 16,
        };
        let probe = date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).expect("valid time"));
        let probe = self.now.timezone().from_local_datetime(&probe).earliest()?;
        self.events.events().iter().find(|e| e.contains(probe))
    }

    pub fn today_morning_peak(&self) -> Option<&'a PeakEvent> {
        self.peak_for_slot(Day::Today, TimeSlot::Am)
    }

    pub fn today_evening_peak(&self) -> Option<&'a PeakEvent> {
        self.peak_for_slot(Day::Today, TimeSlot::Pm)
    }

    pub fn tomorrow_morning_peak(&self) -> Option<&'a PeakEvent> {
        self.peak_for_slot(Day::Tomorrow, TimeSlot::Am)
    }

    pub fn tomorrow_evening_peak(&self) -> Option<&'a PeakEvent> {
        self.peak_for_slot(Day::Tomorrow, TimeSlot::Pm)
    }
}
