//! Core types: peak events, season gating, schedule merge, state classification

pub mod error;
pub mod event;
pub mod marker;
pub mod rate;
pub mod season;
pub mod set;
pub mod state;
pub mod tracing;

pub use error::EventError;
pub use event::{AnchorWindow, Criticality, PeakEvent, REFERENCE_TZ, TimeSlot, TimeWindow};
pub use marker::{ParsedMarker, event_uid, parse_description, render_description, render_summary};
pub use rate::Rate;
pub use season::{is_winter_season, winter_season_bounds};
pub use set::{Announcement, EventSet, PeakHandler, fallback_schedule};
pub use state::{Day, PeakSnapshot, PeakState};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
