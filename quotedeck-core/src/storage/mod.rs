//! Local persistence: key-value backends and the quote store built on them.

mod kv;
mod quote_store;

pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use quote_store::{
    AddOutcome, ImportSummary, QuoteStore, SharedStore, FILTER_KEY, LAST_INDEX_KEY, QUOTES_KEY,
};
