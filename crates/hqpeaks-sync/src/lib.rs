//! Idempotent calendar sync: UID store, change detection, sync engine

pub mod engine;
pub mod error;
pub mod notify;
pub mod runner;
pub mod signature;
pub mod store;

pub use engine::{CalendarSyncEngine, SyncConfig, SyncOutcome, SyncReport};
pub use error::{SyncError, SyncResult};
pub use notify::{DesktopNotifier, Notifier, RecordingNotifier};
pub use runner::SyncRunner;
pub use signature::{critical_signature, event_signature};
pub use store::UidStore;
