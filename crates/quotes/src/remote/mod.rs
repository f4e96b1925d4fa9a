//! Remote quote source
//!
//! This module provides:
//! - The `QuoteSource` trait the sync engine pulls from and pushes to
//! - An HTTP client for a generic post listing endpoint
//! - Mapping from remote post records to quotes

mod client;
mod normalize;

pub use client::HttpQuoteSource;
pub use normalize::{normalize_post, normalize_posts};

use crate::error::Result;
use crate::models::Quote;

/// Where authoritative quotes come from
pub trait QuoteSource: Send + Sync {
    /// Fetch the full remote record set, mapped to quotes
    fn fetch(&self) -> Result<Vec<Quote>>;

    /// Send the local collection to the remote side
    fn push(&self, quotes: &[Quote]) -> Result<()>;
}

/// Remote API record types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// A record from the post listing resource
    #[derive(Debug, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Post {
        pub id: i64,
        pub title: String,
        #[serde(default)]
        pub body: String,
        #[serde(default)]
        pub user_id: Option<i64>,
    }

    /// Payload sent when pushing quotes
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PushRequest<'a> {
        pub quotes: &'a [crate::models::Quote],
        pub pushed_at: chrono::DateTime<chrono::Utc>,
    }
}
