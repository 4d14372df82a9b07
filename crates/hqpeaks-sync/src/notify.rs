//! User notifications for sync failures.
//!
//! The only user-actionable failure in this subsystem is a calendar
//! that stays unreachable past the validation retry budget. That one
//! surfaces as a persistent desktop notification; everything else is
//! logged and retried silently.

use std::sync::Mutex;

use notify_rust::Notification;
#[cfg(target_os = "linux")]
use notify_rust::{Timeout, Urgency};
use tracing::{error, info};

/// Sink for user-facing sync notifications.
pub trait Notifier: Send + Sync {
    /// Emits a notification that stays visible until dismissed.
    fn notify_persistent(&self, summary: &str, body: &str);
}

/// Desktop notifications via the freedesktop notification service.
#[derive(Debug)]
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new("hqpeaks")
    }
}

impl Notifier for DesktopNotifier {
    fn notify_persistent(&self, summary: &str, body: &str) {
        let mut notification = Notification::new();
        notification
            .appname(&self.app_name)
            .summary(summary)
            .body(body);

        #[cfg(target_os = "linux")]
        notification.urgency(Urgency::Critical).timeout(Timeout::Never);

        match notification.show() {
            Ok(_) => info!(summary = %summary, "persistent notification sent"),
            Err(e) => error!(error = %e, summary = %summary, "failed to send notification"),
        }
    }
}

/// Records notifications in memory instead of showing them.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_persistent(&self, summary: &str, body: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((summary.to_string(), body.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_captures() {
        let notifier = RecordingNotifier::new();
        assert_eq!(notifier.count(), 0);

        notifier.notify_persistent("title", "details");
        assert_eq!(notifier.count(), 1);
        assert_eq!(
            notifier.sent(),
            vec![("title".to_string(), "details".to_string())]
        );
    }
}
