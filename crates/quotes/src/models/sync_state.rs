//! Sync bookkeeping persisted next to the quote collection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tracks when the collection last matched the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// When we last successfully synced (None if never)
    #[serde(default)]
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Whether local edits happened since the last successful sync
    #[serde(default)]
    pub has_unsynced_changes: bool,
}

impl SyncState {
    /// Record a local mutation
    pub fn mark_dirty(&mut self) {
        self.has_unsynced_changes = true;
    }

    /// Record a successful sync at the current time
    pub fn mark_synced(&mut self) {
        self.last_sync_at = Some(Utc::now());
        self.has_unsynced_changes = false;
    }

    pub fn has_synced(&self) -> bool {
        self.last_sync_at.is_some()
    }
}
