//! File-based announcement feed.
//!
//! The daemon does not talk to the Hydro-Québec API itself; an external
//! collaborator drops announcement rows into a JSON file and this
//! module reads them back. A missing file means "no announcements", a
//! malformed file is an error the refresh cycle absorbs.

use std::path::Path;

use hqpeaks_core::{Announcement, Rate};
use tracing::{debug, warn};

use crate::error::{DaemonError, DaemonResult};

/// Reads announcement rows for one rate from a JSON file.
///
/// Rows whose offer code does not announce peaks for `rate` are dropped
/// with a warning; the feed file may carry several contracts.
pub fn read_feed(path: &Path, rate: Rate) -> DaemonResult<Vec<Announcement>> {
    if !path.exists() {
        debug!(path = %path.display(), "no feed file, treating as empty");
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| DaemonError::Feed(format!("failed to read feed: {}", e)))?;
    let rows: Vec<Announcement> = serde_json::from_str(&content)
        .map_err(|e| DaemonError::Feed(format!("failed to parse feed: {}", e)))?;

    let offers = rate.offer_codes();
    let (ours, foreign): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .partition(|row| offers.contains(&row.offer.as_str()));
    if !foreign.is_empty() {
        warn!(
            dropped = foreign.len(),
            rate = %rate,
            "dropping feed rows for other offer codes"
        );
    }
    debug!(rows = ours.len(), rate = %rate, "read announcement feed");
    Ok(ours)
}
