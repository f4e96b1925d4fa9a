//! Domain models for quote entities

mod category;
mod quote;
mod sync_state;

pub use category::{ALL_CATEGORIES, CategoryFilter, same_category};
pub(crate) use category::is_reserved_category;
pub use quote::{Quote, QuoteId, default_quotes};
pub use sync_state::SyncState;
