//! The quote collection and its persistence
//!
//! `QuoteStore` owns the ordered collection in memory and writes it back to
//! a durable [`KeyValueStore`] after every local mutation. A second,
//! session-scoped store remembers the most recently displayed quote.

use log::{debug, info, warn};
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use crate::error::{QuoteError, Result};
use crate::models::{
    ALL_CATEGORIES, CategoryFilter, Quote, QuoteId, SyncState, default_quotes, same_category,
};
use crate::storage::KeyValueStore;

/// Fixed keys used in the durable and session stores
pub mod keys {
    /// Durable: the full collection as a JSON array
    pub const QUOTES: &str = "quotes";
    /// Durable: the last selected category filter
    pub const SELECTED_CATEGORY: &str = "selectedCategory";
    /// Durable: sync bookkeeping
    pub const SYNC_STATE: &str = "syncState";
    /// Session: the most recently displayed quote
    pub const LAST_VIEWED: &str = "lastViewedQuote";
}

/// In-memory quote collection backed by durable and session storage
pub struct QuoteStore {
    quotes: Vec<Quote>,
    sync_state: SyncState,
    durable: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
}

impl QuoteStore {
    /// Load the collection from durable storage.
    ///
    /// Falls back to the built-in default list when nothing is stored or
    /// the stored payload can't be parsed. Never fails.
    pub fn restore(durable: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        let quotes = match load_quotes(durable.as_ref()) {
            Ok(Some(quotes)) => quotes,
            Ok(None) => {
                debug!("No persisted quotes, using defaults");
                default_quotes()
            }
            Err(e) => {
                warn!("Ignoring persisted quotes: {}", e);
                default_quotes()
            }
        };

        let sync_state = match durable.get(keys::SYNC_STATE) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring persisted sync state: {}", e);
                SyncState::default()
            }),
            Ok(None) => SyncState::default(),
            Err(e) => {
                warn!("Failed to read sync state: {:#}", e);
                SyncState::default()
            }
        };

        info!("Restored {} quotes", quotes.len());
        Self {
            quotes,
            sync_state,
            durable,
            session,
        }
    }

    /// Create a store holding exactly the given quotes.
    ///
    /// Nothing is written until the first mutation or an explicit [`persist`](Self::persist).
    pub fn with_quotes(
        quotes: Vec<Quote>,
        durable: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            quotes,
            sync_state: SyncState::default(),
            durable,
            session,
        }
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn sync_state(&self) -> &SyncState {
        &self.sync_state
    }

    /// Find a quote by identity
    pub fn get(&self, id: QuoteId) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.id == Some(id))
    }

    /// Quotes passing a category filter, in collection order
    pub fn filtered(&self, filter: &CategoryFilter) -> Vec<&Quote> {
        self.quotes.iter().filter(|q| q.matches(filter)).collect()
    }

    /// Pick a uniformly random quote passing the filter.
    ///
    /// Returns `None` when no quote matches. The picked quote is remembered
    /// in session storage as the last viewed one.
    pub fn select_random(&self, filter: &CategoryFilter) -> Result<Option<Quote>> {
        self.select_random_with(filter, &mut rand::thread_rng())
    }

    /// [`select_random`](Self::select_random) with a caller supplied RNG
    pub fn select_random_with<R: Rng + ?Sized>(
        &self,
        filter: &CategoryFilter,
        rng: &mut R,
    ) -> Result<Option<Quote>> {
        let candidates = self.filtered(filter);
        let Some(quote) = candidates.choose(rng).map(|q| (*q).clone()) else {
            debug!("No quotes available for category {}", filter);
            return Ok(None);
        };

        let json = serde_json::to_string(&quote)
            .map_err(|e| QuoteError::Format(format!("Failed to encode quote: {}", e)))?;
        self.session.set(keys::LAST_VIEWED, &json)?;
        Ok(Some(quote))
    }

    /// The quote most recently returned by `select_random` in this session
    pub fn last_viewed(&self) -> Result<Option<Quote>> {
        let Some(raw) = self.session.get(keys::LAST_VIEWED)? else {
            return Ok(None);
        };
        let quote = serde_json::from_str(&raw)
            .map_err(|e| QuoteError::Format(format!("Unreadable last viewed quote: {}", e)))?;
        Ok(Some(quote))
    }

    /// Add a new quote from user input.
    ///
    /// Both fields are trimmed; an empty field is a validation error and
    /// leaves the collection untouched. The new quote gets a local
    /// (negative) id and is persisted immediately. If persisting fails the
    /// quote and the sync state are rolled back.
    pub fn add(&mut self, text: &str, category: &str) -> Result<Quote> {
        let text = text.trim();
        let category = category.trim();
        if text.is_empty() || category.is_empty() {
            return Err(QuoteError::Validation(
                "Please enter both a quote and a category.".to_string(),
            ));
        }

        let quote = Quote::with_id(self.next_local_id()?, text, category);
        quote.check().map_err(QuoteError::Validation)?;

        let is_new_category = !self.quotes.iter().any(|q| same_category(&q.category, category));

        let previous_state = self.sync_state.clone();
        self.quotes.push(quote.clone());
        self.sync_state.mark_dirty();
        if let Err(e) = self.persist() {
            self.quotes.pop();
            self.sync_state = previous_state;
            return Err(e);
        }

        if is_new_category {
            info!("Added quote in new category {}", category);
        } else {
            info!("Added quote in {}", category);
        }
        Ok(quote)
    }

    /// Distinct categories in first-seen order, deduplicated ignoring case
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.quotes
            .iter()
            .filter(|q| seen.insert(q.category.to_lowercase()))
            .map(|q| q.category.clone())
            .collect()
    }

    /// Categories for a selector: "all" followed by the real categories
    pub fn category_options(&self) -> Vec<String> {
        std::iter::once(ALL_CATEGORIES.to_string())
            .chain(self.categories())
            .collect()
    }

    /// Remember the selected category filter.
    ///
    /// A named filter must match at least one quote in the collection.
    pub fn set_category_filter(&self, filter: &CategoryFilter) -> Result<()> {
        if let CategoryFilter::Named(name) = filter {
            if !self.quotes.iter().any(|q| q.matches(filter)) {
                return Err(QuoteError::Validation(format!("Unknown category: {}", name)));
            }
        }
        self.durable.set(keys::SELECTED_CATEGORY, filter.as_str())?;
        Ok(())
    }

    /// The remembered category filter.
    ///
    /// Falls back to "all" when nothing is stored or the stored category no
    /// longer exists in the collection.
    pub fn category_filter(&self) -> CategoryFilter {
        let stored = match self.durable.get(keys::SELECTED_CATEGORY) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Failed to read selected category: {:#}", e);
                None
            }
        };

        match stored.map(|s| CategoryFilter::parse(&s)) {
            Some(CategoryFilter::Named(name)) => {
                let filter = CategoryFilter::Named(name);
                if self.quotes.iter().any(|q| q.matches(&filter)) {
                    filter
                } else {
                    CategoryFilter::All
                }
            }
            _ => CategoryFilter::All,
        }
    }

    /// Import quotes from JSON text (the export format)
    pub fn import_json(&mut self, json: &str) -> Result<usize> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| QuoteError::Format(format!("Not valid JSON: {}", e)))?;
        self.import_batch(value)
    }

    /// Import quotes from a JSON file
    pub fn import_file(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            QuoteError::Format(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.import_json(&content)
    }

    /// Append a batch of externally supplied records.
    ///
    /// The top-level value must be an array. Every element must decode as a
    /// quote and satisfy the stored-record invariants; otherwise the whole
    /// batch is rejected and the collection is unchanged.
    ///
    /// Ids stay unique: a record identical to one already stored under the
    /// same id is skipped, so importing an export twice changes nothing. A
    /// different record reusing a taken id is stored under a fresh local id.
    /// Returns the number of records appended.
    pub fn import_batch(&mut self, records: Value) -> Result<usize> {
        let Value::Array(items) = records else {
            return Err(QuoteError::Format(
                "Imported data must be a JSON array of quotes".to_string(),
            ));
        };

        let mut known: HashMap<QuoteId, Quote> = HashMap::new();
        for quote in &self.quotes {
            if let Some(id) = quote.id {
                known.entry(id).or_insert_with(|| quote.clone());
            }
        }
        let mut lowest = known.keys().map(|id| id.as_i64()).min().unwrap_or(0);

        let mut imported = Vec::with_capacity(items.len());
        let mut skipped = 0;
        for (index, item) in items.into_iter().enumerate() {
            let mut quote: Quote = serde_json::from_value(item)
                .map_err(|e| QuoteError::Format(format!("Record {}: {}", index, e)))?;
            quote
                .check()
                .map_err(|reason| QuoteError::Format(format!("Record {}: {}", index, reason)))?;

            if let Some(id) = quote.id {
                match known.get(&id) {
                    Some(existing) if *existing == quote => {
                        skipped += 1;
                        continue;
                    }
                    Some(_) => {
                        let fresh = local_id_below(lowest)?;
                        debug!("Record {}: id {} is taken, storing as {}", index, id, fresh);
                        quote.id = Some(fresh);
                    }
                    None => {}
                }
            }

            if let Some(id) = quote.id {
                lowest = lowest.min(id.as_i64());
                known.insert(id, quote.clone());
            }
            imported.push(quote);
        }

        let count = imported.len();
        if count == 0 {
            info!("Nothing to import, {} quotes already present", skipped);
            return Ok(0);
        }

        let previous_len = self.quotes.len();
        let previous_state = self.sync_state.clone();
        self.quotes.extend(imported);
        self.sync_state.mark_dirty();
        if let Err(e) = self.persist() {
            self.quotes.truncate(previous_len);
            self.sync_state = previous_state;
            return Err(e);
        }

        info!("Imported {} quotes ({} already present)", count, skipped);
        Ok(count)
    }

    /// Serialize the whole collection as indented JSON
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.quotes)
            .map_err(|e| QuoteError::Format(format!("Failed to encode quotes: {}", e)))
    }

    /// Write the whole collection to a file as indented JSON
    pub fn export_to_file(&self, path: &Path) -> Result<()> {
        config::save_json_file(path, &self.quotes)?;
        info!("Exported {} quotes to {}", self.quotes.len(), path.display());
        Ok(())
    }

    /// Write the collection and sync state to durable storage
    pub fn persist(&self) -> Result<()> {
        let quotes = serde_json::to_string(&self.quotes)
            .map_err(|e| QuoteError::Format(format!("Failed to encode quotes: {}", e)))?;
        let state = serde_json::to_string(&self.sync_state)
            .map_err(|e| QuoteError::Format(format!("Failed to encode sync state: {}", e)))?;

        self.durable.set(keys::QUOTES, &quotes)?;
        self.durable.set(keys::SYNC_STATE, &state)?;
        debug!("Persisted {} quotes", self.quotes.len());
        Ok(())
    }

    /// Replace the collection with a merged snapshot and record a successful sync
    pub(crate) fn apply_sync(&mut self, merged: Vec<Quote>) -> Result<()> {
        let previous = std::mem::replace(&mut self.quotes, merged);
        let previous_state = self.sync_state.clone();
        self.sync_state.mark_synced();

        if let Err(e) = self.persist() {
            self.quotes = previous;
            self.sync_state = previous_state;
            return Err(e);
        }
        Ok(())
    }

    /// Record that the local collection has been pushed to the server
    pub(crate) fn mark_pushed(&mut self) -> Result<()> {
        self.sync_state.has_unsynced_changes = false;
        self.persist()
    }

    /// One below the smallest id in use, never above -1
    fn next_local_id(&self) -> Result<QuoteId> {
        let lowest = self
            .quotes
            .iter()
            .filter_map(|q| q.id)
            .map(|id| id.as_i64())
            .min()
            .unwrap_or(0);
        local_id_below(lowest)
    }
}

fn local_id_below(lowest: i64) -> Result<QuoteId> {
    lowest
        .min(0)
        .checked_sub(1)
        .map(QuoteId::new)
        .ok_or_else(|| {
            QuoteError::Validation(format!("No local id left below {}", lowest))
        })
}

/// Read and decode the persisted collection, dropping records that break invariants
fn load_quotes(durable: &dyn KeyValueStore) -> Result<Option<Vec<Quote>>> {
    let Some(raw) = durable.get(keys::QUOTES)? else {
        return Ok(None);
    };

    let quotes: Vec<Quote> = serde_json::from_str(&raw)
        .map_err(|e| QuoteError::Format(format!("Unreadable persisted quotes: {}", e)))?;

    let total = quotes.len();
    let valid: Vec<Quote> = quotes.into_iter().filter(|q| q.check().is_ok()).collect();
    if valid.len() < total {
        warn!("Dropped {} invalid persisted quotes", total - valid.len());
    }
    Ok(Some(valid))
}
