//! Change detection for the sync engine.
//!
//! Hashes the critical events of a set so a sync cycle can skip the
//! calendar round-trip entirely when nothing changed since the last
//! pass.

use hqpeaks_core::EventSet;
use sha2::{Digest, Sha256};

/// Computes a signature over the mirrored events of a set.
///
/// Digests the sorted `(start, end, is_critical)` entries, so two sets
/// with identical windows produce the same signature no matter how the
/// events were sourced or ordered. Non-critical events participate
/// only when `include_non_critical` is set, matching what the sync
/// engine would actually write.
pub fn event_signature(events: &EventSet, include_non_critical: bool) -> String {
    let mut entries: Vec<(i64, i64, bool)> = events
        .events()
        .iter()
        .filter(|e| e.is_critical || include_non_critical)
        .map(|e| (e.start.timestamp(), e.end.timestamp(), e.is_critical))
        .collect();
    entries.sort_unstable();

    let mut hasher = Sha256::new();
    for (start, end, critical) in &entries {
        hasher.update(start.to_le_bytes());
        hasher.update(end.to_le_bytes());
        hasher.update([u8::from(*critical)]);
    }
    hex::encode(hasher.finalize())
}

/// Signature over the critical events only.
pub fn critical_signature(events: &EventSet) -> String {
    event_signature(events, false)
}

// Simple hex encoding (avoid adding another dependency)
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes
            .as_ref()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hqpeaks_core::{Criticality, PeakEvent, Rate, REFERENCE_TZ};

    fn critical(day: u32, start_h: u32, end_h: u32) -> PeakEvent {
        PeakEvent::new(
            REFERENCE_TZ.with_ymd_and_hms(2024, 12, day, start_h, 0, 0).unwrap(),
            REFERENCE_TZ.with_ymd_and_hms(2024, 12, day, end_h, 0, 0).unwrap(),
            Criticality::AnnouncedCritical,
            Rate::WinterCredits,
            180,
        )
        .unwrap()
    }

    #[test]
    fn stable_across_ordering() {
        let a = EventSet::from_events(vec![critical(15, 16, 20), critical(16, 6, 10)]);
        let b = EventSet::from_events(vec![critical(16, 6, 10), critical(15, 16, 20)]);
        assert_eq!(critical_signature(&a), critical_signature(&b));
    }

    #[test]
    fn changes_with_windows() {
        let a = EventSet::from_events(vec![critical(15, 16, 20)]);
        let b = EventSet::from_events(vec![critical(15, 16, 19)]);
        let c = EventSet::from_events(vec![critical(16, 16, 20)]);
        assert_ne!(critical_signature(&a), critical_signature(&b));
        assert_ne!(critical_signature(&a), critical_signature(&c));
    }

    #[test]
    fn ignores_non_critical_events() {
        let fallback = hqpeaks_core::fallback_schedule(
            chrono::NaiveDate::from_ymd_opt(2024, 12, 15).unwrap(),
            180,
        );
        let a = EventSet::merge(vec![critical(15, 16, 20)], fallback);
        let b = EventSet::from_events(vec![critical(15, 16, 20)]);
        assert_eq!(critical_signature(&a), critical_signature(&b));
    }

    #[test]
    fn non_critical_windows_register_when_included() {
        let fallback = hqpeaks_core::fallback_schedule(
            chrono::NaiveDate::from_ymd_opt(2024, 12, 15).unwrap(),
            180,
        );
        let a = EventSet::merge(vec![critical(15, 16, 20)], fallback);
        let b = EventSet::from_events(vec![critical(15, 16, 20)]);
        assert_ne!(event_signature(&a, true), event_signature(&b, true));
        assert_eq!(event_signature(&b, true), event_signature(&b, false));
    }

    #[test]
    fn empty_set_is_stable() {
        assert_eq!(
            critical_signature(&EventSet::default()),
            critical_signature(&EventSet::default())
        );
    }

    #[test]
    fn hex_encode() {
        assert_eq!(hex::encode([0x00, 0xff, 0xab]), "00ffab");
        assert_eq!(hex::encode([]), "");
    }
}
