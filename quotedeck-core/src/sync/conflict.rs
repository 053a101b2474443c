//! Conflict detection and resolution.
//!
//! A conflict exists when a remote and a local record share an id but
//! differ in text, author or category. Resolving writes the chosen version
//! into the store; each resolution is independent of the others.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::models::{timestamp_now, QuoteRecord, Source};
use crate::storage::QuoteStore;

/// Resolved entries kept for inspection.
const HISTORY_LIMIT: usize = 50;

/// A divergence between a local and a remote record with the same id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictEntry {
    pub id: String,
    pub local_version: Option<QuoteRecord>,
    pub remote_version: Option<QuoteRecord>,
    pub resolved: bool,
    pub detected_at: DateTime<Utc>,
}

/// What a sync does with the conflicts it detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Apply the remote version immediately.
    #[default]
    RemoteWins,
    /// Leave conflicts pending until resolved explicitly.
    Manual,
}

/// Manual choice for a single conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    KeepRemote,
    KeepLocal,
}

/// Compares a remote snapshot against the local collection.
pub fn detect_conflicts(remote: &[QuoteRecord], local: &[QuoteRecord]) -> Vec<ConflictEntry> {
    let by_id: HashMap<&str, &QuoteRecord> = local.iter().map(|q| (q.id.as_str(), q)).collect();
    let detected_at = timestamp_now();

    remote
        .iter()
        .filter_map(|srv| {
            let local = by_id.get(srv.id.as_str())?;
            if srv.same_content(local) {
                return None;
            }
            Some(ConflictEntry {
                id: srv.id.clone(),
                local_version: Some((*local).clone()),
                remote_version: Some(srv.clone()),
                resolved: false,
                detected_at,
            })
        })
        .collect()
}

/// Resolves every conflict with "remote wins".
pub fn resolve_auto(
    store: &mut QuoteStore,
    conflicts: Vec<ConflictEntry>,
) -> Result<Vec<ConflictEntry>, StorageError> {
    conflicts
        .into_iter()
        .map(|entry| resolve_manual(store, entry, Resolution::KeepRemote))
        .collect()
}

/// Writes the chosen version of one conflict into the store.
///
/// Keeping the local version re-stamps it with a fresh `updated_at` so it is
/// the newer record in any later comparison. If the chosen version is
/// missing nothing is written, but the entry is still marked resolved.
pub fn resolve_manual(
    store: &mut QuoteStore,
    mut entry: ConflictEntry,
    choice: Resolution,
) -> Result<ConflictEntry, StorageError> {
    let chosen = match choice {
        Resolution::KeepRemote => entry
            .remote_version
            .clone()
            .map(|q| q.with_source(Source::Remote)),
        Resolution::KeepLocal => entry.local_version.clone().map(|q| {
            q.with_updated_at(timestamp_now())
                .with_source(Source::Local)
        }),
    };

    if let Some(record) = chosen {
        store.upsert(record)?;
    }
    entry.resolved = true;
    Ok(entry)
}

/// Pending conflicts plus a bounded history of resolved ones.
#[derive(Debug, Default)]
pub struct ConflictLog {
    pending: Vec<ConflictEntry>,
    history: VecDeque<ConflictEntry>,
}

impl ConflictLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[ConflictEntry] {
        &self.pending
    }

    /// Resolved entries, most recent last.
    pub fn history(&self) -> Vec<ConflictEntry> {
        self.history.iter().cloned().collect()
    }

    /// Adds newly detected conflicts, replacing any pending entry with the
    /// same id.
    pub fn add_pending(&mut self, entries: Vec<ConflictEntry>) {
        for entry in entries {
            self.pending.retain(|p| p.id != entry.id);
            self.pending.push(entry);
        }
    }

    /// Removes and returns the pending entry for `id`.
    pub fn take(&mut self, id: &str) -> Option<ConflictEntry> {
        let index = self.pending.iter().position(|p| p.id == id)?;
        Some(self.pending.remove(index))
    }

    pub fn take_all(&mut self) -> Vec<ConflictEntry> {
        std::mem::take(&mut self.pending)
    }

    pub fn record_resolved(&mut self, entry: ConflictEntry) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(entry);
    }
}
