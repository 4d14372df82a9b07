//! Refresh loop wiring the feed, handlers and sync engine together.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use hqpeaks_calendar::{CalendarPeakHandler, InMemoryCalendar};
use hqpeaks_core::{PeakHandler, REFERENCE_TZ, Rate};
use hqpeaks_sync::{CalendarSyncEngine, DesktopNotifier, Notifier, SyncConfig, SyncRunner, UidStore};
use tracing::{info, warn};

use crate::config::DaemonConfig;
use crate::error::DaemonResult;
use crate::feed;

/// How long a refresh waits for the background sync before moving on.
const SYNC_WAIT: Duration = Duration::from_secs(30);

/// One contract's daemon state.
pub struct Daemon {
    config: DaemonConfig,
    rate: Rate,
    peaks: PeakHandler,
    mirror: CalendarPeakHandler,
    runner: SyncRunner,
    dry_run: bool,
}

impl Daemon {
    /// Wires up the daemon from a validated configuration.
    ///
    /// The bundled backend is the in-memory calendar; real backends
    /// implement [`hqpeaks_calendar::CalendarProvider`] and plug in at
    /// the same seam.
    pub async fn new(config: DaemonConfig, dry_run: bool) -> DaemonResult<Self> {
        config.validate()?;
        let rate = config.rate()?;

        let calendar = Arc::new(InMemoryCalendar::new());
        calendar
            .add_calendar(&config.calendar_id, config.contract_name())
            .await;

        let store = UidStore::new(config.uid_store_path());
        if let Err(err) = store.load() {
            warn!(error = %err, "uid store unreadable, starting empty");
        }

        let notifier: Arc<dyn Notifier> = Arc::new(DesktopNotifier::default());
        let sync_config = SyncConfig::new(&config.calendar_id, &config.contract_id, rate)
            .with_contract_name(config.contract_name());
        let engine = CalendarSyncEngine::new(sync_config, calendar.clone(), store, notifier);

        let mirror = CalendarPeakHandler::new(
            calendar,
            config.calendar_id.clone(),
            rate,
            config.preheat_minutes,
        );

        Ok(Self {
            peaks: PeakHandler::new(rate, config.preheat_minutes),
            mirror,
            runner: SyncRunner::new(engine),
            rate,
            config,
            dry_run,
        })
    }

    /// Runs one refresh cycle.
    ///
    /// Feed, sync and mirror failures are each absorbed at their own
    /// boundary; a cycle never aborts the daemon.
    pub async fn refresh(&mut self) -> DaemonResult<()> {
        let now: DateTime<Tz> = Utc::now().with_timezone(&REFERENCE_TZ);

        match feed::read_feed(&self.config.feed_path(), self.rate) {
            Ok(rows) => self.peaks.load_announcements(rows, now.date_naive()),
            Err(err) => warn!(error = %err, "feed read failed, keeping previous events"),
        }

        if self.dry_run {
            info!(
                events = self.peaks.events().len(),
                critical = self.peaks.events().critical().count(),
                "dry run, skipping calendar sync"
            );
        } else if self.runner.trigger(now, self.peaks.events())
            && !self.runner.wait_idle(SYNC_WAIT).await
        {
            warn!("sync cycle still running after bounded wait, proceeding");
        }

        if let Err(err) = self.mirror.load_events(now).await {
            warn!(error = %err, "calendar mirror refresh failed, state is stale");
        }

        let snapshot = self.mirror.snapshot(now);
        info!(
            state = snapshot.current_state().as_str(),
            next_peak = ?snapshot.next_peak().map(|e| e.start.to_rfc3339()),
            next_critical = ?snapshot.next_critical_peak().map(|e| e.start.to_rfc3339()),
            "refresh complete"
        );
        Ok(())
    }

    /// Runs refresh cycles until stopped.
    pub async fn run(&mut self, interval: Duration, once: bool) -> DaemonResult<()> {
        loop {
            self.refresh().await?;
            if once {
                return Ok(());
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// The mirrored event surface, for inspection.
    pub fn mirror(&self) -> &CalendarPeakHandler {
        &self.mirror
    }

    /// The feed-sourced event surface.
    pub fn peaks(&self) -> &PeakHandler {
        &self.peaks
    }
}
