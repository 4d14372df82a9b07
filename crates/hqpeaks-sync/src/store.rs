//! Durable UID storage.
//!
//! Tracks, per contract, the set of event UIDs known to exist in the
//! external calendar. Stored as JSON on disk; the on-disk layout is
//! `{"version": 1, "uids": [...]}` and must stay readable across
//! upgrades.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};

const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    uids: Vec<String>,
    // Absent in files written before the disable marker existed.
    #[serde(default)]
    disabled: bool,
}

/// File-backed set of created-event UIDs.
///
/// The in-memory set is the working copy; `save` rewrites the file
/// atomically via a temp-file rename.
#[derive(Debug)]
pub struct UidStore {
    path: PathBuf,
    uids: RwLock<BTreeSet<String>>,
    disabled: RwLock<bool>,
}

impl UidStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            uids: RwLock::new(BTreeSet::new()),
            disabled: RwLock::new(false),
        }
    }

    /// Loads the UID set from disk.
    ///
    /// Returns Ok(true) if a store file was loaded, Ok(false) if none
    /// exists yet.
    pub fn load(&self) -> SyncResult<bool> {
        if !self.path.exists() {
            debug!("no uid store at {:?}", self.path);
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| SyncError::store_with_source("failed to read store file", e))?;
        let file: StoreFile = serde_json::from_str(&content)
            .map_err(|e| SyncError::store_with_source("failed to parse store file", e))?;
        if file.version != STORE_VERSION {
            return Err(SyncError::store(format!(
                "unsupported store version {}",
                file.version
            )));
        }

        info!(uids = file.uids.len(), "loaded uid store from {:?}", self.path);
        *self.uids.write().unwrap() = file.uids.into_iter().collect();
        *self.disabled.write().unwrap() = file.disabled;
        Ok(true)
    }

    /// Writes the UID set to disk.
    pub fn save(&self) -> SyncResult<()> {
        let uids: Vec<String> = self.uids.read().unwrap().iter().cloned().collect();
        let file = StoreFile {
            version: STORE_VERSION,
            uids,
            disabled: *self.disabled.read().unwrap(),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SyncError::store_with_source("failed to create store directory", e))?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&file)
            .map_err(|e| SyncError::store_with_source("failed to serialize store", e))?;
        fs::write(&temp_path, &content)
            .map_err(|e| SyncError::store_with_source("failed to write store file", e))?;
        fs::rename(&temp_path, &self.path)
            .map_err(|e| SyncError::store_with_source("failed to rename store file", e))?;

        debug!("saved uid store to {:?}", self.path);
        Ok(())
    }

    /// Adds a UID and persists immediately.
    ///
    /// Returns false without touching the file if the UID was already
    /// tracked.
    pub fn record(&self, uid: impl Into<String>) -> SyncResult<bool> {
        let inserted = self.uids.write().unwrap().insert(uid.into());
        if inserted {
            self.save()?;
        }
        Ok(inserted)
    }

    /// Adds every UID from the iterator, persisting once at the end.
    pub fn record_all<I>(&self, uids: I) -> SyncResult<usize>
    where
        I: IntoIterator<Item = String>,
    {
        let added = {
            let mut set = self.uids.write().unwrap();
            uids.into_iter().filter(|uid| set.insert(uid.clone())).count()
        };
        if added > 0 {
            self.save()?;
        }
        Ok(added)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.uids.read().unwrap().contains(uid)
    }

    /// Snapshot of the tracked UIDs.
    pub fn uids(&self) -> Vec<String> {
        self.uids.read().unwrap().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.uids.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.uids.read().unwrap().is_empty()
    }

    /// Whether sync has been durably disabled for this contract.
    pub fn is_disabled(&self) -> bool {
        *self.disabled.read().unwrap()
    }

    /// Durably marks sync disabled, dropping the tracked UIDs.
    ///
    /// The marker survives restarts; only deleting the store file (or
    /// `clear`) re-enables sync.
    pub fn disable(&self) -> SyncResult<()> {
        *self.disabled.write().unwrap() = true;
        self.uids.write().unwrap().clear();
        self.save()
    }

    /// Clears the set and the disable marker, both in memory and on disk.
    pub fn clear(&self) -> SyncResult<()> {
        self.uids.write().unwrap().clear();
        *self.disabled.write().unwrap() = false;
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| SyncError::store_with_source("failed to remove store file", e))?;
            info!("cleared uid store at {:?}", self.path);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
