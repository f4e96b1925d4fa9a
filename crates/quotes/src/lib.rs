//! Quotes crate - Business logic for the quote collection
//!
//! This crate provides platform-independent quote functionality including:
//! - Domain models (Quote, QuoteId, CategoryFilter, SyncState)
//! - Key-value storage abstractions with SQLite and in-memory backends
//! - The QuoteStore: random selection, add, import/export, persistence
//! - A remote quote source over HTTP
//! - A server-wins sync engine
//!
//! This crate has no UI dependencies; front ends own a `QuoteStore` and
//! pass it to whatever needs it.

pub mod config;
pub mod error;
pub mod models;
pub mod remote;
pub mod storage;
pub mod store;
pub mod sync;

pub use self::config::QuotebookConfig;
pub use error::{QuoteError, Result};
pub use models::{ALL_CATEGORIES, CategoryFilter, Quote, QuoteId, SyncState, default_quotes};
pub use remote::{HttpQuoteSource, QuoteSource};
pub use storage::{InMemoryKeyValueStore, KeyValueStore, SqliteKeyValueStore};
pub use store::QuoteStore;
pub use sync::{
    MergeResult, SyncEngine, SyncNotification, SyncObserver, SyncOutcome, SyncStats, SyncStatus,
    cooldown_elapsed, merge_remote, time_until_next_sync,
};
