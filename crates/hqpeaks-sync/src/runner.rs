//! Background execution of sync cycles.
//!
//! One sync at most is in flight per contract; a trigger that arrives
//! while a cycle runs is dropped, not queued. Callers needing the
//! result wait with a bounded timeout and proceed regardless.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::DateTime;
use chrono_tz::Tz;
use hqpeaks_core::EventSet;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

use crate::engine::CalendarSyncEngine;

/// Runs sync cycles in the background, one at a time.
#[derive(Clone)]
pub struct SyncRunner {
    engine: Arc<Mutex<CalendarSyncEngine>>,
    in_flight: Arc<AtomicBool>,
    idle: Arc<Notify>,
}

impl SyncRunner {
    pub fn new(engine: CalendarSyncEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            in_flight: Arc::new(AtomicBool::new(false)),
            idle: Arc::new(Notify::new()),
        }
    }

    /// Starts a sync cycle in the background.
    ///
    /// Returns false without doing anything if a cycle is already in
    /// flight. The event set is cloned into the task so the caller's
    /// copy stays free for the next refresh.
    pub fn trigger(&self, now: DateTime<Tz>, events: &EventSet) -> bool {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("sync already in flight, dropping trigger");
            return false;
        }

        let engine = self.engine.clone();
        let in_flight = self.in_flight.clone();
        let idle = self.idle.clone();
        let events = events.clone();
        tokio::spawn(async move {
            let mut engine = engine.lock().await;
            if let Err(err) = engine.sync(now, &events).await {
                warn!(error = %err, "background sync cycle failed");
            }
            drop(engine);
            in_flight.store(false, Ordering::SeqCst);
            idle.notify_waiters();
        });
        true
    }

    /// Waits for any in-flight cycle to finish, up to `timeout`.
    ///
    /// Returns true if the runner is idle, false on timeout. Never
    /// blocks past the timeout; callers proceed either way.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.idle.notified();
            if !self.in_flight.load(Ordering::SeqCst) {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return false;
            }
        }
    }

    /// Whether a cycle is currently running.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Runs one cycle inline, bypassing the background task.
    ///
    /// Still honors the single-flight guard: fails fast if a background
    /// cycle is running.
    pub async fn sync_now(
        &self,
        now: DateTime<Tz>,
        events: &EventSet,
    ) -> Option<crate::error::SyncResult<crate::engine::SyncReport>> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("sync already in flight, refusing inline sync");
            return None;
        }
        let result = self.engine.lock().await.sync(now, events).await;
        self.in_flight.store(false, Ordering::SeqCst);
        self.idle.notify_waiters();
        Some(result)
    }
}
