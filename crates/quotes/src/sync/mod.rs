//! Sync engine for reconciling the local collection with the server
//!
//! The server is authoritative: on any per-record conflict the remote
//! version overwrites the local one.

mod engine;
mod merge;
mod timing;

pub use engine::{
    SyncEngine, SyncNotification, SyncObserver, SyncOutcome, SyncStats, SyncStatus,
};
pub use merge::{MergeResult, merge_remote};
pub use timing::{cooldown_elapsed, time_until_next_sync};
