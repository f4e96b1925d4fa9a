//! Error types for quote operations

/// Errors surfaced by the quote store and sync engine
///
/// None of these are fatal: every failing operation leaves the collection
/// in its last-known-good state.
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    /// Rejected user input (empty text or category)
    #[error("{0}")]
    Validation(String),

    /// Payload that is not the expected interchange format
    #[error("Invalid format: {0}")]
    Format(String),

    /// Remote endpoint unreachable or returned a non-success status
    #[error("Remote unavailable: {0}")]
    Transport(String),

    /// Local storage backend failure
    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, QuoteError>;
