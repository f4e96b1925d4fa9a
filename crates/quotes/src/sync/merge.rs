//! Server-wins merge of a remote snapshot into the local collection

use std::collections::HashMap;

use crate::models::{Quote, QuoteId};

/// Outcome of merging a remote snapshot
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MergeResult {
    /// Merged collection, local order preserved, new records appended
    pub quotes: Vec<Quote>,
    /// Ids whose local record was overwritten by a differing remote one
    pub conflicts: Vec<QuoteId>,
    /// Number of remote records appended
    pub added: usize,
    /// Number of remote records identical to their local counterpart
    pub unchanged: usize,
}

/// Merge remote records into a copy of the local collection.
///
/// For each remote record:
/// - a local record with the same id that differs is replaced in place
/// - a remote record with no local match is appended
///
/// Local records the server doesn't know about are kept as they are.
pub fn merge_remote(local: &[Quote], remote: Vec<Quote>) -> MergeResult {
    let mut result = MergeResult {
        quotes: local.to_vec(),
        ..MergeResult::default()
    };

    // First occurrence wins when the local collection repeats an id
    let mut positions: HashMap<QuoteId, usize> = HashMap::new();
    for (index, quote) in result.quotes.iter().enumerate() {
        if let Some(id) = quote.id {
            positions.entry(id).or_insert(index);
        }
    }

    for remote_quote in remote {
        let existing = remote_quote.id.and_then(|id| positions.get(&id).copied());
        match existing {
            Some(index) if result.quotes[index] == remote_quote => {
                result.unchanged += 1;
            }
            Some(index) => {
                if let Some(id) = remote_quote.id {
                    result.conflicts.push(id);
                }
                result.quotes[index] = remote_quote;
            }
            None => {
                if let Some(id) = remote_quote.id {
                    positions.insert(id, result.quotes.len());
                }
                result.quotes.push(remote_quote);
                result.added += 1;
            }
        }
    }

    result
}
