//! Calendar synchronization engine.
//!
//! Writes critical peak events into the external calendar exactly
//! once each, self-healing from storage/calendar divergence. Identity
//! is the UID embedded in the event description; the engine never
//! deletes calendar entries.

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use chrono_tz::Tz;
use hqpeaks_core::marker::{UID_PREFIX, render_location};
use hqpeaks_core::{EventSet, Rate, TimeWindow, event_uid, parse_description, render_description, render_summary};
use hqpeaks_calendar::{CalendarProvider, EventDraft};
use tracing::{debug, info, warn};

use crate::error::SyncResult;
use crate::notify::Notifier;
use crate::signature::event_signature;
use crate::store::UidStore;

/// Configuration for one contract's sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Target calendar identifier.
    pub calendar_id: String,
    /// Contract identifier, part of every generated UID.
    pub contract_id: String,
    /// Human-readable contract name for notifications.
    pub contract_name: String,
    /// Rate of the contract.
    pub rate: Rate,
    /// Validation failures tolerated before permanent disable.
    pub max_validation_attempts: u32,
    /// Pause between consecutive event writes.
    pub creation_delay: Duration,
    /// Also mirror non-critical events (off by default).
    pub include_non_critical: bool,
}

impl SyncConfig {
    pub fn new(
        calendar_id: impl Into<String>,
        contract_id: impl Into<String>,
        rate: Rate,
    ) -> Self {
        let contract_id = contract_id.into();
        Self {
            calendar_id: calendar_id.into(),
            contract_name: contract_id.clone(),
            contract_id,
            rate,
            max_validation_attempts: 10,
            creation_delay: Duration::from_millis(100),
            include_non_critical: false,
        }
    }

    /// Builder: set the display name used in notifications.
    pub fn with_contract_name(mut self, name: impl Into<String>) -> Self {
        self.contract_name = name.into();
        self
    }

    /// Builder: set the validation retry budget.
    pub fn with_max_validation_attempts(mut self, max: u32) -> Self {
        self.max_validation_attempts = max;
        self
    }

    /// Builder: set the delay between writes.
    pub fn with_creation_delay(mut self, delay: Duration) -> Self {
        self.creation_delay = delay;
        self
    }

    /// Builder: mirror non-critical events as well.
    pub fn with_non_critical(mut self, include: bool) -> Self {
        self.include_non_critical = include;
        self
    }
}

/// How a sync cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The full query and write pass ran.
    Completed,
    /// Signature unchanged since the last pass; nothing queried.
    Unchanged,
    /// Calendar not ready yet; cycle skipped, will retry.
    Skipped,
    /// Sync is permanently disabled for this contract.
    Disabled,
}

/// Result of one sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    /// Events written to the calendar this cycle.
    pub created: usize,
    /// Candidates already present in calendar or store.
    pub skipped: usize,
    /// Writes that failed; retried on a later cycle.
    pub failed: usize,
}

impl SyncReport {
    fn with_outcome(outcome: SyncOutcome) -> Self {
        Self {
            outcome,
            created: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

/// Syncs critical peaks into an external calendar, once each.
pub struct CalendarSyncEngine {
    config: SyncConfig,
    provider: Arc<dyn CalendarProvider>,
    store: UidStore,
    notifier: Arc<dyn Notifier>,
    validated: bool,
    validation_attempts: u32,
    disabled: bool,
    last_signature: Option<String>,
}

impl CalendarSyncEngine {
    /// Creates an engine over a loaded UID store.
    ///
    /// A store carrying the durable disable marker starts the engine
    /// disabled; a restart never restarts the validation budget.
    pub fn new(
        config: SyncConfig,
        provider: Arc<dyn CalendarProvider>,
        store: UidStore,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let disabled = store.is_disabled();
        if disabled {
            warn!(
                contract = %config.contract_id,
                "uid store carries the disable marker, sync stays off"
            );
        }
        Self {
            config,
            provider,
            store,
            notifier,
            validated: false,
            validation_attempts: 0,
            disabled,
            last_signature: None,
        }
    }

    /// Runs one sync cycle against the given event set.
    ///
    /// Idempotent: an event already known to the calendar or the UID
    /// store is never written again. Per-event write failures are
    /// logged and counted without aborting the rest of the batch; the
    /// change-detection signature is only latched when the whole batch
    /// succeeded, so failed events are retried on the next cycle.
    pub async fn sync(&mut self, now: DateTime<Tz>, events: &EventSet) -> SyncResult<SyncReport> {
        if self.disabled {
            debug!(contract = %self.config.contract_id, "sync disabled, skipping");
            return Ok(SyncReport::with_outcome(SyncOutcome::Disabled));
        }

        if !self.validated {
            match self.validate().await {
                Ok(()) => {}
                Err(report) => return Ok(report),
            }
        }

        let signature = event_signature(events, self.config.include_non_critical);
        if self.last_signature.as_deref() == Some(signature.as_str()) {
            debug!("mirrored events unchanged, skipping calendar pass");
            return Ok(SyncReport::with_outcome(SyncOutcome::Unchanged));
        }

        let candidates: Vec<_> = events
            .events()
            .iter()
            .filter(|e| (e.is_critical || self.config.include_non_critical) && e.end > now)
            .collect();

        let mut report = SyncReport::with_outcome(SyncOutcome::Completed);
        if candidates.is_empty() {
            self.last_signature = Some(signature);
            return Ok(report);
        }

        // Reconcile the store against calendar reality before writing:
        // a crash after a create but before the store save leaves a UID
        // only the calendar knows about.
        let window = candidate_window(&candidates);
        let entries = self.provider.list_events(&self.config.calendar_id, window).await?;
        let uid_prefix = format!("{UID_PREFIX}{}_", self.config.contract_id);
        let in_calendar: Vec<String> = entries
            .iter()
            .filter_map(|e| parse_description(&e.description))
            .map(|m| m.uid)
            .filter(|uid| uid.starts_with(&uid_prefix))
            .collect();
        let recovered = self.store.record_all(in_calendar)?;
        if recovered > 0 {
            info!(recovered, "recovered uids from calendar not present in store");
        }

        for event in candidates {
            let uid = event_uid(&self.config.contract_id, event.start);
            if self.store.contains(&uid) {
                report.skipped += 1;
                continue;
            }

            let draft = EventDraft {
                start: event.start,
                end: event.end,
                summary: render_summary(event.is_critical).to_string(),
                description: render_description(
                    &uid,
                    event.rate,
                    event.is_critical,
                    event.start,
                    event.end,
                    now,
                ),
                location: render_location(event.rate),
            };

            match self.provider.create_event(&self.config.calendar_id, draft).await {
                Ok(()) => {
                    // Only a confirmed write makes the UID durable.
                    self.store.record(&uid)?;
                    report.created += 1;
                    debug!(uid = %uid, "calendar event created");
                    // The backend has no batch write; pace the calls.
                    tokio::time::sleep(self.config.creation_delay).await;
                }
                Err(err) => {
                    warn!(uid = %uid, error = %err, "failed to create calendar event");
                    report.failed += 1;
                }
            }
        }

        if report.failed == 0 {
            self.last_signature = Some(signature);
        }
        info!(
            created = report.created,
            skipped = report.skipped,
            failed = report.failed,
            "sync cycle complete"
        );
        Ok(report)
    }

    async fn validate(&mut self) -> Result<(), SyncReport> {
        let exists = self
            .provider
            .calendar_exists(&self.config.calendar_id)
            .await
            .unwrap_or(false);
        if exists {
            self.validated = true;
            self.validation_attempts = 0;
            return Ok(());
        }

        self.validation_attempts += 1;
        if self.validation_attempts >= self.config.max_validation_attempts {
            self.disable();
            return Err(SyncReport::with_outcome(SyncOutcome::Disabled));
        }
        warn!(
            calendar = %self.config.calendar_id,
            attempt = self.validation_attempts,
            max = self.config.max_validation_attempts,
            "calendar not ready, skipping sync cycle"
        );
        Err(SyncReport::with_outcome(SyncOutcome::Skipped))
    }

    fn disable(&mut self) {
        self.disabled = true;
        // Persisting the marker keeps the contract disabled across
        // restarts, and keeps the notification a one-time event.
        if let Err(err) = self.store.disable() {
            warn!(error = %err, "failed to persist disable marker");
        }
        self.notifier.notify_persistent(
            "Synchronisation du calendrier désactivée",
            &format!(
                "Le calendrier {} est introuvable après {} tentatives pour le contrat {}. \
                 Reconfigurez la synchronisation du calendrier.",
                self.config.calendar_id,
                self.config.max_validation_attempts,
                self.config.contract_name,
            ),
        );
        warn!(
            contract = %self.config.contract_id,
            "calendar sync permanently disabled"
        );
    }

    /// Whether sync has been permanently disabled.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Whether the calendar passed validation.
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub fn validation_attempts(&self) -> u32 {
        self.validation_attempts
    }

    pub fn store(&self) -> &UidStore {
        &self.store
    }
}

fn candidate_window(candidates: &[&hqpeaks_core::PeakEvent]) -> TimeWindow {
    let mut start = candidates[0].start;
    let mut end = candidates[0].end;
    for event in &candidates[1..] {
        start = start.min(event.start);
        end = end.max(event.end);
    }
    TimeWindow::new(start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hqpeaks_core::{Criticality, PeakEvent, REFERENCE_TZ};
    use hqpeaks_calendar::InMemoryCalendar;
    use tempfile::TempDir;

    use crate::notify::RecordingNotifier;

    fn local(day: u32, hour: u32) -> DateTime<Tz> {
        REFERENCE_TZ.with_ymd_and_hms(2024, 12, day, hour, 0, 0).unwrap()
    }

    fn critical(day: u32, start_h: u32, end_h: u32) -> PeakEvent {
        PeakEvent::new(
            local(day, start_h),
            local(day, end_h),
            Criticality::AnnouncedCritical,
            Rate::WinterCredits,
            180,
        )
        .unwrap()
    }

    struct Fixture {
        calendar: Arc<InMemoryCalendar>,
        notifier: Arc<RecordingNotifier>,
        dir: TempDir,
    }

    impl Fixture {
        async fn new() -> Self {
            let calendar = Arc::new(InMemoryCalendar::new());
            calendar.add_calendar("peaks", "Pointes Hydro").await;
            Self {
                calendar,
                notifier: Arc::new(RecordingNotifier::new()),
                dir: TempDir::new().unwrap(),
            }
        }

        fn engine(&self) -> CalendarSyncEngine {
            self.engine_with(SyncConfig::new("peaks", "123456789", Rate::WinterCredits)
                .with_creation_delay(Duration::from_millis(0)))
        }

        fn engine_with(&self, config: SyncConfig) -> CalendarSyncEngine {
            let store = UidStore::new(self.dir.path().join("uids.json"));
            let _ = store.load();
            CalendarSyncEngine::new(
                config,
                self.calendar.clone(),
                store,
                self.notifier.clone(),
            )
        }
    }

    #[tokio::test]
    async fn creates_critical_events_once() {
        let fx = Fixture::new().await;
        let mut engine = fx.engine();
        let events = EventSet::from_events(vec![critical(15, 16, 20), critical(16, 6, 10)]);

        let report = engine.sync(local(15, 8), &events).await.unwrap();
        assert_eq!(report.outcome, SyncOutcome::Completed);
        assert_eq!(report.created, 2);
        assert_eq!(fx.calendar.created_count(), 2);

        // Same set again: signature gate short-circuits.
        let report = engine.sync(local(15, 9), &events).await.unwrap();
        assert_eq!(report.outcome, SyncOutcome::Unchanged);
        assert_eq!(fx.calendar.created_count(), 2);
    }

    #[tokio::test]
    async fn store_dedup_survives_restart() {
        let fx = Fixture::new().await;
        let events = EventSet::from_events(vec![critical(15, 16, 20)]);

        let mut engine = fx.engine();
        engine.sync(local(15, 8), &events).await.unwrap();
        assert_eq!(fx.calendar.created_count(), 1);

        // Fresh engine, no signature memory, same persisted store.
        let mut engine = fx.engine();
        let report = engine.sync(local(15, 9), &events).await.unwrap();
        assert_eq!(report.outcome, SyncOutcome::Completed);
        assert_eq!(report.created, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(fx.calendar.created_count(), 1);
    }

    #[tokio::test]
    async fn reconciles_calendar_entries_missing_from_store() {
        let fx = Fixture::new().await;
        let events = EventSet::from_events(vec![critical(15, 16, 20)]);

        // First engine writes the event; its store is then lost.
        let mut engine = fx.engine();
        engine.sync(local(15, 8), &events).await.unwrap();
        engine.store().clear().unwrap();

        let mut engine = fx.engine();
        let report = engine.sync(local(15, 9), &events).await.unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(fx.calendar.created_count(), 1);
        // The recovered UID is persisted again.
        assert_eq!(engine.store().len(), 1);
    }

    #[tokio::test]
    async fn skips_past_events() {
        let fx = Fixture::new().await;
        let mut engine = fx.engine();
        let events = EventSet::from_events(vec![critical(14, 16, 20), critical(15, 16, 20)]);

        let report = engine.sync(local(15, 8), &events).await.unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(fx.calendar.created_count(), 1);
    }

    #[tokio::test]
    async fn non_critical_events_excluded_by_default() {
        let fx = Fixture::new().await;
        let mut engine = fx.engine();
        let generated = hqpeaks_core::fallback_schedule(
            chrono::NaiveDate::from_ymd_opt(2024, 12, 15).unwrap(),
            180,
        );
        let events = EventSet::merge(vec![critical(15, 16, 20)], generated);

        let report = engine.sync(local(15, 8), &events).await.unwrap();
        assert_eq!(report.created, 1);
    }

    #[tokio::test]
    async fn non_critical_changes_bypass_signature_gate() {
        let fx = Fixture::new().await;
        let config = SyncConfig::new("peaks", "123456789", Rate::WinterCredits)
            .with_creation_delay(Duration::from_millis(0))
            .with_non_critical(true);
        let mut engine = fx.engine_with(config);

        let critical_only = EventSet::from_events(vec![critical(15, 16, 20)]);
        engine.sync(local(15, 8), &critical_only).await.unwrap();

        // Same critical windows, three new generated slots: the cycle
        // must run, not gate off as unchanged.
        let generated = hqpeaks_core::fallback_schedule(
            chrono::NaiveDate::from_ymd_opt(2024, 12, 15).unwrap(),
            180,
        );
        let events = EventSet::merge(vec![critical(15, 16, 20)], generated);
        let report = engine.sync(local(15, 8), &events).await.unwrap();
        assert_eq!(report.outcome, SyncOutcome::Completed);
        assert_eq!(report.created, 3);
    }

    #[tokio::test]
    async fn partial_write_failure_retries_next_cycle() {
        let fx = Fixture::new().await;
        let mut engine = fx.engine();
        let events = EventSet::from_events(vec![critical(15, 16, 20)]);

        fx.calendar.set_fail_creates(true);
        let report = engine.sync(local(15, 8), &events).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.created, 0);
        assert!(engine.store().is_empty());

        // Signature was not latched, so the next cycle retries.
        fx.calendar.set_fail_creates(false);
        let report = engine.sync(local(15, 9), &events).await.unwrap();
        assert_eq!(report.outcome, SyncOutcome::Completed);
        assert_eq!(report.created, 1);
        assert_eq!(engine.store().len(), 1);
    }

    #[tokio::test]
    async fn query_failure_aborts_cycle() {
        let fx = Fixture::new().await;
        let mut engine = fx.engine();
        let events = EventSet::from_events(vec![critical(15, 16, 20)]);

        fx.calendar.set_fail_queries(true);
        assert!(engine.sync(local(15, 8), &events).await.is_err());
        assert_eq!(fx.calendar.created_count(), 0);

        fx.calendar.set_fail_queries(false);
        let report = engine.sync(local(15, 9), &events).await.unwrap();
        assert_eq!(report.created, 1);
    }

    #[tokio::test]
    async fn validation_retries_then_disables() {
        let fx = Fixture::new().await;
        let config = SyncConfig::new("missing", "123456789", Rate::WinterCredits)
            .with_max_validation_attempts(3)
            .with_creation_delay(Duration::from_millis(0));
        let mut engine = fx.engine_with(config);
        let events = EventSet::from_events(vec![critical(15, 16, 20)]);

        for _ in 0..2 {
            let report = engine.sync(local(15, 8), &events).await.unwrap();
            assert_eq!(report.outcome, SyncOutcome::Skipped);
            assert!(!engine.is_disabled());
        }

        let report = engine.sync(local(15, 8), &events).await.unwrap();
        assert_eq!(report.outcome, SyncOutcome::Disabled);
        assert!(engine.is_disabled());
        assert_eq!(fx.notifier.count(), 1);
        assert!(engine.store().is_empty());

        // Disabled stays disabled, with no further notifications.
        let report = engine.sync(local(15, 9), &events).await.unwrap();
        assert_eq!(report.outcome, SyncOutcome::Disabled);
        assert_eq!(fx.notifier.count(), 1);
    }

    #[tokio::test]
    async fn disable_marker_survives_restart() {
        let fx = Fixture::new().await;
        let config = SyncConfig::new("missing", "123456789", Rate::WinterCredits)
            .with_max_validation_attempts(1)
            .with_creation_delay(Duration::from_millis(0));
        let events = EventSet::from_events(vec![critical(15, 16, 20)]);

        let mut engine = fx.engine_with(config.clone());
        let report = engine.sync(local(15, 8), &events).await.unwrap();
        assert_eq!(report.outcome, SyncOutcome::Disabled);
        assert_eq!(fx.notifier.count(), 1);

        // A fresh engine over the same store file starts disabled, does
        // not resume validation and never notifies again.
        let mut engine = fx.engine_with(config);
        assert!(engine.is_disabled());
        let report = engine.sync(local(15, 9), &events).await.unwrap();
        assert_eq!(report.outcome, SyncOutcome::Disabled);
        assert_eq!(fx.notifier.count(), 1);
    }

    #[tokio::test]
    async fn empty_candidate_set_completes() {
        let fx = Fixture::new().await;
        let mut engine = fx.engine();

        let report = engine.sync(local(15, 8), &EventSet::default()).await.unwrap();
        assert_eq!(report.outcome, SyncOutcome::Completed);
        assert_eq!(report.created, 0);

        let report = engine.sync(local(15, 9), &EventSet::default()).await.unwrap();
        assert_eq!(report.outcome, SyncOutcome::Unchanged);
    }

    #[tokio::test]
    async fn foreign_contract_uids_not_recorded() {
        let fx = Fixture::new().await;
        let events = EventSet::from_events(vec![critical(15, 16, 20)]);

        // Another contract's event occupies the same window.
        let other_uid = event_uid("987654321", local(15, 16));
        fx.calendar
            .seed_entry(
                "peaks",
                hqpeaks_calendar::CalendarEntry {
                    start: local(15, 16),
                    end: local(15, 20),
                    summary: render_summary(true).to_string(),
                    description: render_description(
                        &other_uid,
                        Rate::WinterCredits,
                        true,
                        local(15, 16),
                        local(15, 20),
                        local(15, 8),
                    ),
                },
            )
            .await;

        let mut engine = fx.engine();
        let report = engine.sync(local(15, 8), &events).await.unwrap();
        // Our event is still created; the foreign UID is not adopted.
        assert_eq!(report.created, 1);
        assert_eq!(engine.store().len(), 1);
        assert!(!engine.store().contains(&other_uid));
    }
}
