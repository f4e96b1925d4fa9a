//! Storage trait definitions

use anyhow::Result;

/// Trait for string key-value storage
///
/// Implementations use interior locking so a store can be shared behind an
/// `Arc` between the quote store and whoever else needs it.
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under a key
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace the value under a key
    fn set(&self, key: &str, value: &str) -> Result<()>;
}
