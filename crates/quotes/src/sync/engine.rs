//! Sync engine state machine
//!
//! `Idle -> Syncing -> {Synced | SyncFailed}`. A periodic timer and an
//! explicit user action can both request a sync; attempts are serialized
//! so a request arriving while one is in flight is reported as
//! [`SyncOutcome::AlreadyRunning`] instead of racing it.

use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::merge::merge_remote;
use super::timing::cooldown_elapsed;
use crate::error::{QuoteError, Result};
use crate::models::{Quote, QuoteId, SyncState};
use crate::remote::QuoteSource;
use crate::store::QuoteStore;

/// Where the engine is in its cycle
///
/// `Synced` and `SyncFailed` are idle states that remember how the last
/// attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Syncing,
    Synced,
    SyncFailed,
}

impl SyncStatus {
    pub fn is_syncing(&self) -> bool {
        matches!(self, Self::Syncing)
    }
}

/// Statistics from a sync operation
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncStats {
    /// Number of records fetched from the server
    pub fetched: usize,
    /// Number of remote records appended locally
    pub added: usize,
    /// Number of local records overwritten by the server
    pub updated: usize,
    /// Number of remote records already identical locally
    pub unchanged: usize,
    /// Number of remote records dropped because they are not valid quotes
    pub rejected: usize,
    /// Duration of the sync operation
    pub duration_ms: u64,
}

/// Result of a sync request that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The sync ran to completion
    Completed(SyncStats),
    /// Another sync was in flight; nothing was done
    AlreadyRunning,
}

/// User-facing events raised while syncing
#[derive(Debug, Clone, PartialEq)]
pub enum SyncNotification {
    /// A local record was overwritten by the server version
    Conflict { id: QuoteId },
    /// The server could not be reached; local data is still valid
    Offline { reason: String },
    /// A sync finished successfully
    Synced { stats: SyncStats },
}

/// Receiver for sync notifications
pub trait SyncObserver: Send + Sync {
    fn on_notification(&self, notification: &SyncNotification);
}

/// Clears the in-flight flag when dropped
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Drives fetch-and-merge cycles against a [`QuoteSource`]
pub struct SyncEngine {
    source: Arc<dyn QuoteSource>,
    observer: Option<Arc<dyn SyncObserver>>,
    status: Mutex<SyncStatus>,
    in_flight: AtomicBool,
}

impl SyncEngine {
    /// Create an engine pulling from the given source
    pub fn new(source: Arc<dyn QuoteSource>) -> Self {
        Self {
            source,
            observer: None,
            status: Mutex::new(SyncStatus::Idle),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Deliver notifications to an observer
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn status(&self) -> SyncStatus {
        self.status.lock().map(|s| *s).unwrap_or(SyncStatus::Idle)
    }

    /// Whether a periodic sync is due given the store's sync state
    pub fn should_sync(state: &SyncState, interval: Duration) -> bool {
        cooldown_elapsed(state.last_sync_at, interval)
    }

    /// Fetch the remote snapshot and merge it into the store.
    ///
    /// On a transport failure the store is left exactly as it was and an
    /// `Offline` notification is raised.
    pub fn sync_once(&self, store: &mut QuoteStore) -> Result<SyncOutcome> {
        self.run(|remote| self.apply(store, remote))
    }

    /// Like [`sync_once`](Self::sync_once) for a store shared between threads.
    ///
    /// The lock is only taken for the merge, not while waiting on the network.
    pub fn sync_shared(&self, store: &Mutex<QuoteStore>) -> Result<SyncOutcome> {
        self.run(|remote| {
            let mut guard = lock_store(store)?;
            self.apply(&mut guard, remote)
        })
    }

    /// Send the local collection to the server.
    ///
    /// Returns the number of quotes pushed. Clears the unsynced-changes flag
    /// on success.
    pub fn push_local(&self, store: &mut QuoteStore) -> Result<usize> {
        let _guard = self.acquire_for_push()?;

        let count = store.len();
        self.send(store.quotes())?;

        store.mark_pushed()?;
        info!("Pushed {} local quotes", count);
        Ok(count)
    }

    /// Like [`push_local`](Self::push_local) for a store shared between threads.
    ///
    /// The collection is copied under the lock and sent without holding it.
    /// Edits made while the request is out keep the unsynced-changes flag set.
    pub fn push_shared(&self, store: &Mutex<QuoteStore>) -> Result<usize> {
        let _guard = self.acquire_for_push()?;

        let snapshot = lock_store(store)?.quotes().to_vec();
        self.send(&snapshot)?;

        let mut guard = lock_store(store)?;
        if guard.quotes() == snapshot.as_slice() {
            guard.mark_pushed()?;
        } else {
            debug!("Quotes changed during push, keeping unsynced flag");
        }
        info!("Pushed {} local quotes", snapshot.len());
        Ok(snapshot.len())
    }

    fn acquire_for_push(&self) -> Result<InFlightGuard<'_>> {
        InFlightGuard::acquire(&self.in_flight)
            .ok_or_else(|| QuoteError::Transport("A sync is already in progress".to_string()))
    }

    fn send(&self, quotes: &[Quote]) -> Result<()> {
        self.source.push(quotes).inspect_err(|e| {
            self.notify(SyncNotification::Offline {
                reason: e.to_string(),
            });
        })
    }

    fn run<F>(&self, merge: F) -> Result<SyncOutcome>
    where
        F: FnOnce(Vec<Quote>) -> Result<SyncStats>,
    {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!("Sync requested while another is running");
            return Ok(SyncOutcome::AlreadyRunning);
        };

        let start = Instant::now();
        self.set_status(SyncStatus::Syncing);

        let remote = match self.source.fetch() {
            Ok(remote) => remote,
            Err(e) => {
                warn!("Sync failed, working offline: {}", e);
                self.set_status(SyncStatus::SyncFailed);
                self.notify(SyncNotification::Offline {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        match merge(remote) {
            Ok(mut stats) => {
                stats.duration_ms = start.elapsed().as_millis() as u64;
                self.set_status(SyncStatus::Synced);
                info!(
                    "Sync complete: {} fetched, {} added, {} updated in {}ms",
                    stats.fetched, stats.added, stats.updated, stats.duration_ms
                );
                self.notify(SyncNotification::Synced {
                    stats: stats.clone(),
                });
                Ok(SyncOutcome::Completed(stats))
            }
            Err(e) => {
                warn!("Failed to apply synced quotes: {}", e);
                self.set_status(SyncStatus::SyncFailed);
                Err(e)
            }
        }
    }

    /// Merge a fetched snapshot and persist the result.
    ///
    /// Remote records that break the stored-record invariants are dropped
    /// before merging.
    fn apply(&self, store: &mut QuoteStore, remote: Vec<Quote>) -> Result<SyncStats> {
        let fetched = remote.len();
        let (valid, invalid): (Vec<Quote>, Vec<Quote>) =
            remote.into_iter().partition(|q| q.check().is_ok());
        for quote in &invalid {
            if let Err(reason) = quote.check() {
                warn!("Dropping remote quote {:?}: {}", quote.id, reason);
            }
        }

        let merged = merge_remote(store.quotes(), valid);

        store.apply_sync(merged.quotes)?;

        for id in &merged.conflicts {
            info!("Conflict on quote {}: server version kept", id);
            self.notify(SyncNotification::Conflict { id: *id });
        }

        Ok(SyncStats {
            fetched,
            added: merged.added,
            updated: merged.conflicts.len(),
            unchanged: merged.unchanged,
            rejected: invalid.len(),
            duration_ms: 0,
        })
    }

    fn set_status(&self, status: SyncStatus) {
        if let Ok(mut guard) = self.status.lock() {
            *guard = status;
        }
    }

    fn notify(&self, notification: SyncNotification) {
        if let Some(observer) = &self.observer {
            observer.on_notification(&notification);
        }
    }
}

fn lock_store(store: &Mutex<QuoteStore>) -> Result<MutexGuard<'_, QuoteStore>> {
    store
        .lock()
        .map_err(|_| QuoteError::Storage(anyhow::anyhow!("Quote store lock poisoned")))
}
