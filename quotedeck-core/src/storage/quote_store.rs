//! The authoritative local quote collection.
//!
//! `QuoteStore` owns the in-memory collection and writes it through to a
//! persistent [`KeyValueStore`] on every mutation. A write only replaces the
//! in-memory collection after the blob has been persisted, so a failed write
//! never leaves the two out of step.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rand::Rng;
use serde_json::Value;

use super::kv::KeyValueStore;
use crate::error::{ImportError, ParseError, StorageError, StoreError, ValidationError};
use crate::events::{DeckEvent, Notifier};
use crate::merge::dedupe;
use crate::models::{categories, normalize, CategoryFilter, QuoteFields, QuoteInput, QuoteRecord};

/// Persistent key holding the JSON array of quotes.
pub const QUOTES_KEY: &str = "quotedeck_quotes_v3";
/// Session key holding the last displayed positional index.
pub const LAST_INDEX_KEY: &str = "quotedeck_last_index_v1";
/// Persistent key holding the category filter.
pub const FILTER_KEY: &str = "quotedeck_filter_v1";

/// Result of adding a single quote.
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    Added(QuoteRecord),
    /// Same id or same `(text, author)` as an existing quote; nothing written.
    Duplicate,
}

/// Counts from a successful import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    /// Records that were new to the store.
    pub imported: usize,
    /// Valid records dropped as duplicates.
    pub duplicates: usize,
    /// Records discarded by validation.
    pub invalid: usize,
}

pub struct QuoteStore {
    quotes: Vec<QuoteRecord>,
    filter: CategoryFilter,
    persistent: Box<dyn KeyValueStore>,
    session: Box<dyn KeyValueStore>,
    notifier: Notifier,
}

impl QuoteStore {
    /// Opens the store, loading quotes and the saved filter.
    ///
    /// A missing quotes blob seeds the store with a few starter quotes. A
    /// corrupt blob loads as an empty collection.
    pub fn open(
        persistent: Box<dyn KeyValueStore>,
        session: Box<dyn KeyValueStore>,
        notifier: Notifier,
    ) -> Result<Self, StorageError> {
        let mut store = Self {
            quotes: Vec::new(),
            filter: CategoryFilter::All,
            persistent,
            session,
            notifier,
        };

        match store.persistent.get(QUOTES_KEY)? {
            Some(raw) => store.quotes = parse_persisted(&raw),
            None => {
                let seeded = default_quotes();
                store.write_blob(&seeded)?;
                store.quotes = seeded;
            }
        }

        let saved = store.persistent.get(FILTER_KEY)?.unwrap_or_default();
        let filter = CategoryFilter::parse(&saved);
        store.filter = if filter.is_available_in(&store.quotes) {
            filter
        } else {
            CategoryFilter::All
        };

        Ok(store)
    }

    pub fn records(&self) -> &[QuoteRecord] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&QuoteRecord> {
        self.quotes.iter().find(|q| q.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.quotes.iter().position(|q| q.id == id)
    }

    pub fn categories(&self) -> Vec<String> {
        categories(&self.quotes)
    }

    // ========== Filter ==========

    pub fn filter(&self) -> &CategoryFilter {
        &self.filter
    }

    /// Selects and persists a filter. A filter that matches nothing falls
    /// back to `All`; the filter actually applied is returned.
    pub fn set_filter(&mut self, filter: CategoryFilter) -> Result<CategoryFilter, StorageError> {
        let filter = if filter.is_available_in(&self.quotes) {
            filter
        } else {
            CategoryFilter::All
        };
        self.persistent.set(FILTER_KEY, filter.as_str())?;
        self.filter = filter.clone();
        self.notifier.emit(DeckEvent::FilterChanged(filter.clone()));
        Ok(filter)
    }

    /// Quotes matching the active filter.
    pub fn filtered(&self) -> Vec<QuoteRecord> {
        self.filtered_by(&self.filter)
    }

    pub fn filtered_by(&self, filter: &CategoryFilter) -> Vec<QuoteRecord> {
        self.quotes
            .iter()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect()
    }

    // ========== Mutations ==========

    /// Normalizes and appends a quote unless it duplicates an existing one.
    pub fn add(&mut self, input: impl Into<QuoteInput>) -> Result<AddOutcome, StoreError> {
        let candidate = normalize(input).ok_or(ValidationError::EmptyText)?;
        if self.position(&candidate.id).is_some() {
            return Ok(AddOutcome::Duplicate);
        }
        let next = dedupe(self.quotes.iter().cloned().chain([candidate.clone()]));
        if !next.iter().any(|q| q.id == candidate.id) {
            return Ok(AddOutcome::Duplicate);
        }

        self.commit(next)?;
        Ok(AddOutcome::Added(candidate))
    }

    pub fn remove(&mut self, id: &str) -> Result<QuoteRecord, StoreError> {
        let index = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let mut next = self.quotes.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        Ok(removed)
    }

    /// Overwrites the record with the same id, or appends it. Any other
    /// record with the same content is dropped in favour of `record`.
    pub fn upsert(&mut self, record: QuoteRecord) -> Result<(), StorageError> {
        let key = record.content_key();
        let mut next: Vec<QuoteRecord> = self
            .quotes
            .iter()
            .filter(|q| q.id == record.id || q.content_key() != key)
            .cloned()
            .collect();
        match next.iter().position(|q| q.id == record.id) {
            Some(i) => next[i] = record,
            None => next.push(record),
        }
        self.commit(dedupe(next))
    }

    /// Replaces the whole collection (after deduplication).
    pub fn replace_all(&mut self, records: Vec<QuoteRecord>) -> Result<(), StorageError> {
        self.commit(dedupe(records))
    }

    /// Removes every quote and resets the filter.
    pub fn clear_all(&mut self) -> Result<(), StorageError> {
        self.persistent.remove(QUOTES_KEY)?;
        self.commit(Vec::new())?;
        self.session.remove(LAST_INDEX_KEY)?;
        if self.filter != CategoryFilter::All {
            self.set_filter(CategoryFilter::All)?;
        }
        Ok(())
    }

    // ========== Import / export ==========

    /// Imports already-shaped inputs. Inputs that normalize to nothing are
    /// counted as invalid; the store is untouched when nothing valid remains.
    pub fn import_inputs(
        &mut self,
        inputs: impl IntoIterator<Item = QuoteInput>,
    ) -> Result<ImportSummary, ImportError> {
        let mut invalid = 0;
        let mut candidates = Vec::new();
        for input in inputs {
            match normalize(input) {
                Some(record) => candidates.push(record),
                None => invalid += 1,
            }
        }
        self.import_records(candidates, invalid)
    }

    /// Imports raw JSON values, validating each one.
    pub fn import_values(&mut self, values: &[Value]) -> Result<ImportSummary, ImportError> {
        let mut invalid = 0;
        let mut candidates = Vec::new();
        for value in values {
            match QuoteInput::from_value(value).map(normalize) {
                Ok(Some(record)) => candidates.push(record),
                Ok(None) => invalid += 1,
                Err(e) => {
                    tracing::debug!("Skipping invalid quote in import: {}", e);
                    invalid += 1;
                }
            }
        }
        self.import_records(candidates, invalid)
    }

    /// Imports a JSON document that must be an array of quotes.
    pub fn import_json(&mut self, json: &str) -> Result<ImportSummary, ImportError> {
        let value: Value = serde_json::from_str(json).map_err(ParseError::from)?;
        match value {
            Value::Array(values) => self.import_values(&values),
            _ => Err(ParseError::NotAnArray.into()),
        }
    }

    fn import_records(
        &mut self,
        candidates: Vec<QuoteRecord>,
        invalid: usize,
    ) -> Result<ImportSummary, ImportError> {
        if candidates.is_empty() {
            return Err(ImportError::NoValidQuotes);
        }

        let valid = candidates.len();
        let existing: HashSet<&str> = self.quotes.iter().map(|q| q.id.as_str()).collect();
        let candidate_ids: HashSet<String> = candidates
            .iter()
            .filter(|q| !existing.contains(q.id.as_str()))
            .map(|q| q.id.clone())
            .collect();
        let next = dedupe(self.quotes.iter().cloned().chain(candidates));
        let imported = next
            .iter()
            .filter(|q| candidate_ids.contains(&q.id))
            .count();

        self.commit(next)?;

        Ok(ImportSummary {
            imported,
            duplicates: valid - imported,
            invalid,
        })
    }

    /// Pretty-printed JSON array of every quote.
    pub fn export_json(&self) -> Result<String, StorageError> {
        serde_json::to_string_pretty(&self.quotes).map_err(|e| StorageError::Encode(e.to_string()))
    }

    // ========== Display position ==========

    /// Last displayed index from the session store, if still in range.
    pub fn last_viewed_index(&self) -> Option<usize> {
        self.session
            .get(LAST_INDEX_KEY)
            .ok()
            .flatten()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&i| i < self.quotes.len())
    }

    pub fn current(&self) -> Option<QuoteRecord> {
        self.last_viewed_index().map(|i| self.quotes[i].clone())
    }

    /// Displays the quote at `index` (clamped into range) and remembers it
    /// for the session.
    pub fn show_at(&mut self, index: usize) -> Option<QuoteRecord> {
        if self.quotes.is_empty() {
            return None;
        }
        let index = index.min(self.quotes.len() - 1);
        if let Err(e) = self.session.set(LAST_INDEX_KEY, &index.to_string()) {
            tracing::warn!("Failed to remember displayed quote: {}", e);
        }
        self.notifier.emit(DeckEvent::CurrentChanged { index });
        Some(self.quotes[index].clone())
    }

    /// Displays a random quote from the active filter.
    pub fn show_random(&mut self) -> Option<QuoteRecord> {
        let pool = self.filtered();
        if pool.is_empty() {
            return None;
        }
        let pick = &pool[rand::rng().random_range(0..pool.len())];
        let index = self.position(&pick.id).unwrap_or(0);
        self.show_at(index)
    }

    // ========== Persistence ==========

    fn commit(&mut self, next: Vec<QuoteRecord>) -> Result<(), StorageError> {
        self.write_blob(&next)?;
        self.quotes = next;
        self.notifier.emit(DeckEvent::QuotesChanged {
            count: self.quotes.len(),
        });

        if !self.filter.is_available_in(&self.quotes) {
            self.set_filter(CategoryFilter::All)?;
        }
        Ok(())
    }

    fn write_blob(&mut self, quotes: &[QuoteRecord]) -> Result<(), StorageError> {
        let json =
            serde_json::to_string(quotes).map_err(|e| StorageError::Encode(e.to_string()))?;
        self.persistent.set(QUOTES_KEY, &json)
    }
}

/// Parses a persisted quotes blob, dropping anything invalid.
fn parse_persisted(raw: &str) -> Vec<QuoteRecord> {
    let values = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(values)) => values,
        Ok(_) => {
            tracing::warn!("Stored quotes are not an array; starting empty");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!("Stored quotes are corrupt ({}); starting empty", e);
            return Vec::new();
        }
    };

    dedupe(
        values
            .iter()
            .filter_map(|v| QuoteInput::from_value(v).ok())
            .filter_map(normalize),
    )
}

fn default_quotes() -> Vec<QuoteRecord> {
    [
        (
            "The best way to predict the future is to invent it.",
            "Alan Kay",
            "Innovation",
        ),
        ("What we think, we become.", "Buddha", "Mindset"),
        (
            "Simplicity is the soul of efficiency.",
            "Austin Freeman",
            "Productivity",
        ),
    ]
    .into_iter()
    .filter_map(|(text, author, category)| {
        normalize(QuoteFields {
            text: text.to_string(),
            author: Some(author.to_string()),
            category: Some(category.to_string()),
            ..QuoteFields::default()
        })
    })
    .collect()
}

/// Cloneable handle to a store shared between the view and the sync loop.
///
/// The lock is never held across an `.await`.
#[derive(Clone)]
pub struct SharedStore(Arc<Mutex<QuoteStore>>);

impl SharedStore {
    pub fn new(store: QuoteStore) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    pub fn lock(&self) -> MutexGuard<'_, QuoteStore> {
        self.0.lock()
    }
}
