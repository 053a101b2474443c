//! QuoteDeck Core Library
//!
//! Local-first quote collection with pull/merge/push sync against a remote
//! posts endpoint.

pub mod deck;
pub mod error;
pub mod events;
pub mod merge;
pub mod models;
pub mod remote;
pub mod storage;
pub mod sync;

pub use deck::QuoteDeck;
pub use error::{
    ConflictError, ImportError, ParseError, StorageError, StoreError, SyncError, TransportError,
    ValidationError,
};
pub use events::{DeckEvent, Notifier};
pub use merge::{dedupe, local_only, merge};
pub use models::{
    categories, generate_id, normalize, validate, CategoryFilter, QuoteFields, QuoteInput,
    QuoteRecord, Source,
};
pub use remote::{check_server, HttpRemote, RemoteCollection, RemoteItem};
pub use storage::{
    AddOutcome, FileStore, ImportSummary, KeyValueStore, MemoryStore, QuoteStore, SharedStore,
};
pub use sync::{
    AutoSync, ConflictEntry, ConflictPolicy, Resolution, SyncOrchestrator, SyncOutcome,
    SyncReport, SyncStatus,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
