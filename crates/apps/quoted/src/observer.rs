//! Prints sync notifications for the user

use quotes::{SyncNotification, SyncObserver};

/// Writes sync notifications to stderr
pub struct ConsoleObserver;

impl SyncObserver for ConsoleObserver {
    fn on_notification(&self, notification: &SyncNotification) {
        match notification {
            SyncNotification::Conflict { id } => {
                eprintln!("Conflict: quote {} was replaced by the server version.", id)
            }
            SyncNotification::Offline { reason } => {
                eprintln!("Offline: could not reach the server ({}). Local quotes are kept.", reason)
            }
            SyncNotification::Synced { stats } => eprintln!(
                "Synced: {} new, {} updated from the server.",
                stats.added, stats.updated
            ),
        }
    }
}
