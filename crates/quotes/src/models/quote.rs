//! Quote model representing a single text/category record

use serde::{Deserialize, Serialize};
use std::fmt;

use super::category::{CategoryFilter, is_reserved_category};

/// Identity of a quote
///
/// Server-assigned ids are positive. Quotes created locally and not yet
/// synced carry negative ids so they can never collide with remote records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(pub i64);

impl QuoteId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Whether this id was assigned locally (not yet known to the server)
    pub fn is_local(&self) -> bool {
        self.0 < 0
    }
}

impl From<i64> for QuoteId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A quote: some text and the category it is filed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Identity, absent for records that never had one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<QuoteId>,
    /// Quote text
    pub text: String,
    /// Category label, compared case-insensitively
    pub category: String,
}

impl Quote {
    /// Create a quote without an identity
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            category: category.into(),
        }
    }

    /// Create a quote with an identity
    pub fn with_id(
        id: impl Into<QuoteId>,
        text: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            text: text.into(),
            category: category.into(),
        }
    }

    /// Check the stored-record invariants.
    ///
    /// Returns a human readable reason when the quote must not be stored.
    pub fn check(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("quote text must not be empty".to_string());
        }
        if self.category.trim().is_empty() {
            return Err("quote category must not be empty".to_string());
        }
        if is_reserved_category(&self.category) {
            return Err(format!(
                "\"{}\" is reserved and cannot be used as a category",
                self.category
            ));
        }
        Ok(())
    }

    /// Whether this quote passes the given category filter
    pub fn matches(&self, filter: &CategoryFilter) -> bool {
        filter.matches(&self.category)
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" - [{}]", self.text, self.category)
    }
}

/// The built-in collection used when nothing has been persisted yet
pub fn default_quotes() -> Vec<Quote> {
    vec![
        Quote::new(
            "The only limit to our realization of tomorrow is our doubts of today.",
            "Motivation",
        ),
        Quote::new(
            "Life is what happens when you're busy making other plans.",
            "Life",
        ),
        Quote::new("You miss 100% of the shots you don't take.", "Inspiration"),
    ]
}
