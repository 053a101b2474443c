//! `QuoteDeck`: the store, the sync orchestrator and the event stream
//! behind one handle.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::error::{ConflictError, ImportError, StorageError, StoreError};
use crate::events::{DeckEvent, Notifier};
use crate::models::{CategoryFilter, QuoteInput, QuoteRecord};
use crate::remote::RemoteCollection;
use crate::storage::{AddOutcome, ImportSummary, KeyValueStore, QuoteStore, SharedStore};
use crate::sync::{
    AutoSync, ConflictEntry, ConflictPolicy, Resolution, SyncOrchestrator, SyncOutcome, SyncStatus,
};

pub struct QuoteDeck {
    store: SharedStore,
    sync: Arc<SyncOrchestrator>,
    notifier: Notifier,
}

impl QuoteDeck {
    pub fn open(
        persistent: Box<dyn KeyValueStore>,
        session: Box<dyn KeyValueStore>,
        remote: Arc<dyn RemoteCollection>,
        policy: ConflictPolicy,
    ) -> Result<Self, StorageError> {
        let notifier = Notifier::new();
        let store = SharedStore::new(QuoteStore::open(persistent, session, notifier.clone())?);
        let sync = Arc::new(SyncOrchestrator::new(
            store.clone(),
            remote,
            policy,
            notifier.clone(),
        ));
        Ok(Self {
            store,
            sync,
            notifier,
        })
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeckEvent> {
        self.notifier.subscribe()
    }

    // ========== Collection ==========

    /// The current collection, in order. The displayed quote is
    /// [`QuoteDeck::last_viewed`].
    pub fn get_current(&self) -> Vec<QuoteRecord> {
        self.store.lock().records().to_vec()
    }

    pub fn get_filtered(&self, filter: &CategoryFilter) -> Vec<QuoteRecord> {
        self.store.lock().filtered_by(filter)
    }

    pub fn categories(&self) -> Vec<String> {
        self.store.lock().categories()
    }

    /// Adds a quote and displays it when it was new.
    pub fn add(&self, input: impl Into<QuoteInput>) -> Result<AddOutcome, StoreError> {
        let mut store = self.store.lock();
        let outcome = store.add(input)?;
        if let AddOutcome::Added(quote) = &outcome {
            if let Some(index) = store.position(&quote.id) {
                store.show_at(index);
            }
        }
        Ok(outcome)
    }

    pub fn remove(&self, id: &str) -> Result<QuoteRecord, StoreError> {
        self.store.lock().remove(id)
    }

    pub fn clear_all(&self) -> Result<(), StorageError> {
        self.store.lock().clear_all()
    }

    // ========== Import / export ==========

    pub fn import_batch(
        &self,
        inputs: impl IntoIterator<Item = QuoteInput>,
    ) -> Result<ImportSummary, ImportError> {
        self.store.lock().import_inputs(inputs)
    }

    /// Imports a JSON file containing an array of quotes.
    pub async fn import_file(&self, path: &Path) -> Result<ImportSummary, ImportError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ImportError::Read(path.to_path_buf(), e))?;
        self.store.lock().import_json(&contents)
    }

    /// Snapshot of every quote, in collection order.
    pub fn export_all(&self) -> Vec<QuoteRecord> {
        self.get_current()
    }

    pub fn export_json(&self) -> Result<String, StorageError> {
        self.store.lock().export_json()
    }

    // ========== Display ==========

    pub fn show_random(&self) -> Option<QuoteRecord> {
        self.store.lock().show_random()
    }

    pub fn show_at(&self, index: usize) -> Option<QuoteRecord> {
        self.store.lock().show_at(index)
    }

    /// The quote displayed last in this session, if any.
    pub fn last_viewed(&self) -> Option<QuoteRecord> {
        self.store.lock().current()
    }

    pub fn filter(&self) -> CategoryFilter {
        self.store.lock().filter().clone()
    }

    pub fn set_filter(&self, filter: CategoryFilter) -> Result<CategoryFilter, StorageError> {
        self.store.lock().set_filter(filter)
    }

    // ========== Sync ==========

    pub async fn sync_now(&self) -> SyncOutcome {
        self.sync.sync_now().await
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync.status()
    }

    pub fn resolve(&self, id: &str, choice: Resolution) -> Result<ConflictEntry, ConflictError> {
        self.sync.resolve(id, choice)
    }

    pub fn resolve_all(&self) -> Result<Vec<ConflictEntry>, ConflictError> {
        self.sync.resolve_all()
    }

    pub fn pending_conflicts(&self) -> Vec<ConflictEntry> {
        self.sync.pending_conflicts()
    }

    pub fn conflict_history(&self) -> Vec<ConflictEntry> {
        self.sync.conflict_history()
    }

    /// Starts periodic syncing; it stops when the returned handle drops.
    pub fn start_auto_sync(&self, interval: Duration) -> AutoSync {
        AutoSync::start(self.sync.clone(), interval)
    }
}
