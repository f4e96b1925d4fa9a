//! Key-value storage backends
//!
//! The quote store keeps everything it persists as JSON strings under a few
//! fixed keys, so a backend only needs string get/set. The trait lets the
//! durable store (SQLite) and the session store (in-memory) be swapped freely.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;
pub use traits::KeyValueStore;
