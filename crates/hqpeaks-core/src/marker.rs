//! Calendar wire format: UID and criticality markers in free text.
//!
//! The target calendar write API has no custom-metadata fields, so the
//! event identity and criticality are embedded in the description text
//! and recovered by substring search. All embedding and parsing lives
//! here; nothing else in the workspace touches the text layout.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::rate::Rate;

/// Prefix of every UID this system writes.
pub const UID_PREFIX: &str = "hydroqc_";

/// Description line carrying the UID marker.
const UID_LINE_PREFIX: &str = "ID: ";
const UID_MARKER: &str = "ID: hydroqc_";
const CRITICAL_MARKER: &str = "Critique: Oui";
const RATE_LINE_PREFIX: &str = "Tarif: ";

/// Event titles, standardized for automation blueprints.
pub const TITLE_CRITICAL: &str = "🔴 Pointe critique";
pub const TITLE_REGULAR: &str = "⚪ Pointe régulière";

/// Generates the stable UID for one logical peak event.
///
/// Pure function of `(contract_id, start)`: recomputable anywhere,
/// never looked up by identity.
pub fn event_uid(contract_id: &str, start: DateTime<Tz>) -> String {
    format!("{UID_PREFIX}{contract_id}_{}", start.to_rfc3339())
}

/// The event summary for a peak of the given criticality.
pub fn render_summary(is_critical: bool) -> &'static str {
    if is_critical { TITLE_CRITICAL } else { TITLE_REGULAR }
}

/// The location text carrying the rate for automation filters.
pub fn render_location(rate: Rate) -> String {
    format!("Hydro-Québec {rate}")
}

/// Renders the event description embedding the UID and criticality.
pub fn render_description(
    uid: &str,
    rate: Rate,
    is_critical: bool,
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    created_at: DateTime<Tz>,
) -> String {
    format!(
        "Réduisez votre consommation d'électricité pendant cette période.\n\n\
         Début: {start}\n\
         Fin: {end}\n\n\
         --- Métadonnées ---\n\
         Ajouté le: {created}\n\
         {rate_line}{rate}\n\
         Critique: {critical}\n\
         {uid_line}{uid}",
        start = start.format("%H:%M"),
        end = end.format("%H:%M"),
        created = created_at.format("%Y-%m-%d %H:%M:%S %Z"),
        rate_line = RATE_LINE_PREFIX,
        critical = if is_critical { "Oui" } else { "Non" },
        uid_line = UID_LINE_PREFIX,
    )
}

/// Markers recovered from a calendar entry's description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMarker {
    /// The embedded UID.
    pub uid: String,
    /// Criticality marker; absent marker means non-critical.
    pub is_critical: bool,
    /// The embedded rate, when present and recognized.
    pub rate: Option<Rate>,
}

/// Extracts our markers from free text.
///
/// Text without the UID marker is not one of our entries and yields
/// `None`; downstream callers discard such entries.
pub fn parse_description(description: &str) -> Option<ParsedMarker> {
    let uid_at = description.find(UID_MARKER)?;
    let uid_line = description[uid_at..].lines().next()?;
    let uid = uid_line.trim_start_matches(UID_LINE_PREFIX).trim().to_string();
    if !uid.starts_with(UID_PREFIX) {
        return None;
    }

    let rate = description.find(RATE_LINE_PREFIX).and_then(|at| {
        let line = description[at + RATE_LINE_PREFIX.len()..].lines().next()?;
        Rate::from_code(line.trim()).ok()
    });

    Some(ParsedMarker {
        uid,
        is_critical: description.contains(CRITICAL_MARKER),
        rate,
    })
}
