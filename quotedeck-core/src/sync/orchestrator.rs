//! One-shot pull/merge/push sync cycles.
//!
//! A cycle fetches the remote collection, reconciles it with the local
//! store, and pushes local-only quotes back. At most one cycle runs at a
//! time per orchestrator; a trigger that arrives while one is in flight is
//! skipped, not queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::conflict::{
    detect_conflicts, resolve_auto, resolve_manual, ConflictEntry, ConflictLog, ConflictPolicy,
    Resolution,
};
use super::status::{SyncPhase, SyncStatus};
use crate::error::{ConflictError, StorageError, SyncError, TransportError};
use crate::events::{DeckEvent, Notifier};
use crate::merge::{local_only, merge};
use crate::models::{timestamp_now, QuoteRecord};
use crate::remote::{from_remote, to_remote, RemoteCollection};
use crate::storage::SharedStore;

/// Counts from a completed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// Remote items that mapped to valid quotes.
    pub fetched: usize,
    /// Conflicts detected in this cycle.
    pub conflicts: usize,
    /// Conflicts left pending for manual resolution.
    pub pending_conflicts: usize,
    /// Size of the local collection after the merge.
    pub merged: usize,
    /// Local-only quotes accepted by the remote.
    pub pushed: usize,
    pub completed_at: DateTime<Utc>,
}

/// A local-only quote the remote refused.
#[derive(Debug, Clone, PartialEq)]
pub struct PushFailure {
    pub quote_id: String,
    pub error: TransportError,
}

#[derive(Debug)]
pub enum SyncOutcome {
    /// Another cycle was already in flight.
    Skipped,
    Completed(SyncReport),
    /// The merge was committed but some pushes failed.
    PartialSuccess {
        report: SyncReport,
        push_failures: Vec<PushFailure>,
    },
    /// Nothing was committed locally.
    Failed(SyncError),
}

impl SyncOutcome {
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            SyncOutcome::Completed(report) | SyncOutcome::PartialSuccess { report, .. } => {
                Some(report)
            }
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SyncOutcome::Failed(_))
    }
}

/// Clears the in-flight flag when a cycle ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncOrchestrator {
    store: SharedStore,
    remote: Arc<dyn RemoteCollection>,
    policy: ConflictPolicy,
    notifier: Notifier,
    in_progress: AtomicBool,
    status: Mutex<SyncStatus>,
    conflicts: Mutex<ConflictLog>,
}

impl SyncOrchestrator {
    pub fn new(
        store: SharedStore,
        remote: Arc<dyn RemoteCollection>,
        policy: ConflictPolicy,
        notifier: Notifier,
    ) -> Self {
        Self {
            store,
            remote,
            policy,
            notifier,
            in_progress: AtomicBool::new(false),
            status: Mutex::new(SyncStatus::default()),
            conflicts: Mutex::new(ConflictLog::new()),
        }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub fn status(&self) -> SyncStatus {
        self.status.lock().clone()
    }

    /// True while a cycle is in flight.
    pub fn is_syncing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    pub fn pending_conflicts(&self) -> Vec<ConflictEntry> {
        self.conflicts.lock().pending().to_vec()
    }

    pub fn conflict_history(&self) -> Vec<ConflictEntry> {
        self.conflicts.lock().history()
    }

    /// Runs one sync cycle unless one is already running.
    pub async fn sync_now(&self) -> SyncOutcome {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Sync already in progress, skipping");
            return SyncOutcome::Skipped;
        }
        let _in_flight = InFlight(&self.in_progress);

        self.update_status(|s| s.phase = SyncPhase::Syncing);
        let outcome = self.run_cycle().await;

        match &outcome {
            SyncOutcome::Completed(report) => {
                tracing::info!(
                    "Sync complete: {} fetched, {} merged, {} pushed",
                    report.fetched,
                    report.merged,
                    report.pushed
                );
                self.finish(report, 0);
            }
            SyncOutcome::PartialSuccess {
                report,
                push_failures,
            } => {
                tracing::warn!(
                    "Sync complete with {} push failure(s)",
                    push_failures.len()
                );
                self.finish(report, push_failures.len());
            }
            SyncOutcome::Failed(e) => {
                tracing::warn!("Sync failed: {}", e);
                let message = e.to_string();
                self.update_status(|s| {
                    s.phase = SyncPhase::Failed;
                    s.last_error = Some(message);
                });
                self.update_status(|s| s.phase = SyncPhase::Idle);
            }
            SyncOutcome::Skipped => {}
        }

        outcome
    }

    async fn run_cycle(&self) -> SyncOutcome {
        let items = match self.remote.fetch_all().await {
            Ok(items) => items,
            Err(e) => return SyncOutcome::Failed(e.into()),
        };
        let remote: Vec<QuoteRecord> = items.iter().filter_map(from_remote).collect();
        tracing::debug!("Fetched {} remote quote(s)", remote.len());

        let (mut report, to_push) = match self.reconcile(&remote) {
            Ok(result) => result,
            Err(e) => return SyncOutcome::Failed(e.into()),
        };

        let mut push_failures = Vec::new();
        for quote in &to_push {
            match self.remote.create(&to_remote(quote)).await {
                Ok(ack) => {
                    tracing::debug!("Pushed {} (remote id {:?})", quote.id, ack.remote_id);
                    report.pushed += 1;
                }
                Err(error) => {
                    tracing::warn!("Failed to push {}: {}", quote.id, error);
                    push_failures.push(PushFailure {
                        quote_id: quote.id.clone(),
                        error,
                    });
                }
            }
        }

        report.completed_at = timestamp_now();
        if push_failures.is_empty() {
            SyncOutcome::Completed(report)
        } else {
            SyncOutcome::PartialSuccess {
                report,
                push_failures,
            }
        }
    }

    /// Applies conflicts and the merge under the store lock. Returns the
    /// partial report and the local-only quotes to push.
    fn reconcile(
        &self,
        remote: &[QuoteRecord],
    ) -> Result<(SyncReport, Vec<QuoteRecord>), StorageError> {
        let mut store = self.store.lock();
        let detected = detect_conflicts(remote, store.records());
        let conflicts = detected.len();

        let pending = {
            let mut log = self.conflicts.lock();
            match self.policy {
                ConflictPolicy::RemoteWins => {
                    for entry in resolve_auto(&mut store, detected)? {
                        tracing::info!("Conflict on {} resolved: remote wins", entry.id);
                        log.record_resolved(entry);
                    }
                }
                ConflictPolicy::Manual => {
                    for entry in &detected {
                        tracing::info!("Conflict on {} left for manual resolution", entry.id);
                    }
                    log.add_pending(detected);
                }
            }
            log.pending().len()
        };

        let to_push = local_only(remote, store.records());
        let merged = merge(remote, store.records());
        store.replace_all(merged)?;
        let merged = store.len();
        drop(store);

        if self.policy == ConflictPolicy::Manual && conflicts > 0 {
            self.notifier.emit(DeckEvent::ConflictsChanged { pending });
        }

        Ok((
            SyncReport {
                fetched: remote.len(),
                conflicts,
                pending_conflicts: pending,
                merged,
                pushed: 0,
                completed_at: timestamp_now(),
            },
            to_push,
        ))
    }

    /// Resolves one pending conflict with an explicit choice.
    pub fn resolve(&self, id: &str, choice: Resolution) -> Result<ConflictEntry, ConflictError> {
        let mut store = self.store.lock();
        let mut log = self.conflicts.lock();
        let entry = log
            .take(id)
            .ok_or_else(|| ConflictError::NotFound(id.to_string()))?;

        match resolve_manual(&mut store, entry.clone(), choice) {
            Ok(resolved) => {
                tracing::info!("Conflict on {} resolved: {:?}", id, choice);
                log.record_resolved(resolved.clone());
                let pending = log.pending().len();
                drop(log);
                drop(store);
                self.notifier.emit(DeckEvent::ConflictsChanged { pending });
                Ok(resolved)
            }
            Err(e) => {
                log.add_pending(vec![entry]);
                Err(e.into())
            }
        }
    }

    /// Resolves every pending conflict with "remote wins".
    pub fn resolve_all(&self) -> Result<Vec<ConflictEntry>, ConflictError> {
        let mut store = self.store.lock();
        let mut log = self.conflicts.lock();
        let pending = log.take_all();
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let mut resolved = Vec::with_capacity(pending.len());
        let mut remaining = pending.into_iter();
        while let Some(entry) = remaining.next() {
            match resolve_manual(&mut store, entry.clone(), Resolution::KeepRemote) {
                Ok(done) => {
                    log.record_resolved(done.clone());
                    resolved.push(done);
                }
                Err(e) => {
                    log.add_pending(std::iter::once(entry).chain(remaining).collect());
                    return Err(e.into());
                }
            }
        }
        drop(log);
        drop(store);

        tracing::info!("Resolved {} conflict(s): remote wins", resolved.len());
        self.notifier.emit(DeckEvent::ConflictsChanged { pending: 0 });
        Ok(resolved)
    }

    fn finish(&self, report: &SyncReport, push_failures: usize) {
        self.update_status(|s| {
            s.phase = SyncPhase::Idle;
            s.last_sync_at = Some(report.completed_at);
            s.last_error = None;
            s.last_push_failures = push_failures;
        });
    }

    fn update_status(&self, apply: impl FnOnce(&mut SyncStatus)) {
        let snapshot = {
            let mut status = self.status.lock();
            apply(&mut status);
            status.clone()
        };
        self.notifier.emit(DeckEvent::SyncStatusChanged(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use crate::remote::{CreateAck, RemoteItem};
    use crate::storage::{AddOutcome, KeyValueStore, MemoryStore, QuoteStore, QUOTES_KEY};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// In-memory remote with switchable failures and an optional gate that
    /// holds `fetch_all` open until released.
    #[derive(Default)]
    struct FakeRemote {
        items: Mutex<Vec<RemoteItem>>,
        created: Mutex<Vec<RemoteItem>>,
        fetches: AtomicUsize,
        fail_fetch: AtomicBool,
        fail_create: AtomicBool,
        gate: Option<(Notify, Notify)>,
    }

    impl FakeRemote {
        fn with_quotes(quotes: &[QuoteRecord]) -> Self {
            let remote = Self::default();
            *remote.items.lock() = quotes.iter().map(to_remote).collect();
            remote
        }

        fn gated(mut self) -> Self {
            self.gate = Some((Notify::new(), Notify::new()));
            self
        }
    }

    #[async_trait]
    impl RemoteCollection for FakeRemote {
        async fn fetch_all(&self) -> Result<Vec<RemoteItem>, TransportError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }
            if self.fail_fetch.load(Ordering::SeqCst) {
                return Err(TransportError::Request("connection refused".into()));
            }
            Ok(self.items.lock().clone())
        }

        async fn create(&self, item: &RemoteItem) -> Result<CreateAck, TransportError> {
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(TransportError::Status(503));
            }
            self.created.lock().push(item.clone());
            Ok(CreateAck {
                remote_id: Some(101),
            })
        }
    }

    fn quote(id: &str, text: &str, author: &str) -> QuoteRecord {
        QuoteRecord::new(text).with_id(id).with_author(author)
    }

    fn store_with(quotes: &[QuoteRecord], notifier: &Notifier) -> SharedStore {
        let mut persistent = MemoryStore::new();
        persistent
            .set(QUOTES_KEY, &serde_json::to_string(quotes).unwrap())
            .unwrap();
        SharedStore::new(
            QuoteStore::open(
                Box::new(persistent),
                Box::new(MemoryStore::new()),
                notifier.clone(),
            )
            .unwrap(),
        )
    }

    fn orchestrator(
        local: &[QuoteRecord],
        remote: Arc<FakeRemote>,
        policy: ConflictPolicy,
    ) -> (SyncOrchestrator, SharedStore) {
        let notifier = Notifier::new();
        let store = store_with(local, &notifier);
        let orch = SyncOrchestrator::new(store.clone(), remote, policy, notifier);
        (orch, store)
    }

    #[tokio::test]
    async fn test_conflict_resolved_remote_wins() {
        let remote = Arc::new(FakeRemote::with_quotes(&[quote("1", "B", "X")]));
        let (orch, store) = orchestrator(
            &[quote("1", "A", "X")],
            remote.clone(),
            ConflictPolicy::RemoteWins,
        );

        let outcome = orch.sync_now().await;
        let report = outcome.report().unwrap();
        assert_eq!(report.conflicts, 1);
        assert_eq!(report.pending_conflicts, 0);

        let store = store.lock();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("1").unwrap().text, "B");
        assert_eq!(store.get("1").unwrap().source, Source::Remote);
        drop(store);

        assert!(orch.pending_conflicts().is_empty());
        assert_eq!(orch.conflict_history().len(), 1);
        assert!(remote.created.lock().is_empty());
    }

    #[tokio::test]
    async fn test_merge_and_push_local_only() {
        let remote = Arc::new(FakeRemote::with_quotes(&[quote("r1", "Remote", "")]));
        let (orch, store) = orchestrator(
            &[quote("l1", "Local", "Me")],
            remote.clone(),
            ConflictPolicy::RemoteWins,
        );

        let outcome = orch.sync_now().await;
        assert!(matches!(outcome, SyncOutcome::Completed(_)));
        assert_eq!(outcome.report().unwrap().pushed, 1);

        let ids: Vec<String> = store.lock().records().iter().map(|q| q.id.clone()).collect();
        assert_eq!(ids, vec!["r1", "l1"]);

        let created = remote.created.lock();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].title, "Local");

        let status = orch.status();
        assert_eq!(status.state(), "idle");
        assert!(status.last_sync_at.is_some());
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_store_untouched() {
        let remote = Arc::new(FakeRemote::default());
        remote.fail_fetch.store(true, Ordering::SeqCst);
        let local = vec![quote("1", "A", ""), quote("2", "B", "")];
        let (orch, store) = orchestrator(&local, remote.clone(), ConflictPolicy::RemoteWins);

        let outcome = orch.sync_now().await;
        assert!(matches!(
            outcome,
            SyncOutcome::Failed(SyncError::Transport(_))
        ));
        assert_eq!(store.lock().records(), local.as_slice());
        assert_eq!(orch.status().state(), "failed");
        assert!(!orch.is_syncing());
        assert!(remote.created.lock().is_empty());
    }

    #[tokio::test]
    async fn test_push_failure_is_partial_success() {
        let remote = Arc::new(FakeRemote::default());
        remote.fail_create.store(true, Ordering::SeqCst);
        let (orch, store) = orchestrator(
            &[quote("l1", "Local", "")],
            remote.clone(),
            ConflictPolicy::RemoteWins,
        );

        match orch.sync_now().await {
            SyncOutcome::PartialSuccess {
                report,
                push_failures,
            } => {
                assert_eq!(report.pushed, 0);
                assert_eq!(push_failures.len(), 1);
                assert_eq!(push_failures[0].quote_id, "l1");
                assert_eq!(push_failures[0].error, TransportError::Status(503));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(store.lock().len(), 1);
        assert_eq!(orch.status().last_push_failures, 1);
        assert_eq!(orch.status().state(), "idle");
    }

    #[tokio::test]
    async fn test_failure_then_success_clears_error() {
        let remote = Arc::new(FakeRemote::default());
        remote.fail_fetch.store(true, Ordering::SeqCst);
        let (orch, _store) = orchestrator(&[], remote.clone(), ConflictPolicy::RemoteWins);

        assert!(orch.sync_now().await.is_failed());
        remote.fail_fetch.store(false, Ordering::SeqCst);
        assert!(!orch.sync_now().await.is_failed());
        assert_eq!(orch.status().last_error, None);
    }

    #[tokio::test]
    async fn test_at_most_one_sync_in_flight() {
        let remote = Arc::new(FakeRemote::default().gated());
        let (orch, _store) = orchestrator(&[], remote.clone(), ConflictPolicy::RemoteWins);
        let orch = Arc::new(orch);

        let first = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.sync_now().await })
        };

        let (entered, release) = remote.gate.as_ref().unwrap();
        entered.notified().await;
        assert!(orch.is_syncing());
        assert_eq!(orch.status().state(), "syncing");

        assert!(matches!(orch.sync_now().await, SyncOutcome::Skipped));

        release.notify_one();
        let outcome = first.await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Completed(_)));
        assert_eq!(remote.fetches.load(Ordering::SeqCst), 1);
        assert!(!orch.is_syncing());
    }

    #[tokio::test]
    async fn test_manual_policy_keeps_conflicts_pending() {
        let remote = Arc::new(FakeRemote::with_quotes(&[quote("1", "Theirs", "X")]));
        let (orch, store) = orchestrator(
            &[quote("1", "Mine", "X")],
            remote.clone(),
            ConflictPolicy::Manual,
        );
        let outcome = orch.sync_now().await;
        assert_eq!(outcome.report().unwrap().pending_conflicts, 1);
        let pending = orch.pending_conflicts();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].local_version.as_ref().unwrap().text, "Mine");

        let resolved = orch.resolve("1", Resolution::KeepLocal).unwrap();
        assert!(resolved.resolved);
        assert!(orch.pending_conflicts().is_empty());

        let store = store.lock();
        assert_eq!(store.get("1").unwrap().text, "Mine");
        assert_eq!(store.get("1").unwrap().source, Source::Local);
    }

    #[tokio::test]
    async fn test_keep_local_then_add_and_import() {
        let remote = Arc::new(FakeRemote::with_quotes(&[
            quote("q1", "B", "X"),
            quote("r2", "A", "X"),
        ]));
        let (orch, store) = orchestrator(
            &[quote("q1", "A", "X")],
            remote.clone(),
            ConflictPolicy::Manual,
        );
        orch.sync_now().await;
        orch.resolve("q1", Resolution::KeepLocal).unwrap();

        let mut store = store.lock();
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].id, "q1");
        assert_eq!(store.records()[0].text, "A");

        let outcome = store.add("A brand new quote").unwrap();
        assert!(matches!(outcome, AddOutcome::Added(_)));
        assert_eq!(store.len(), 2);

        let summary = store
            .import_json(r#"[{"text":"a","author":"x"},{"text":"Another"}]"#)
            .unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_resolve_unknown_conflict() {
        let remote = Arc::new(FakeRemote::default());
        let (orch, _store) = orchestrator(&[], remote, ConflictPolicy::Manual);
        assert!(matches!(
            orch.resolve("nope", Resolution::KeepRemote),
            Err(ConflictError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_all_applies_remote() {
        let remote = Arc::new(FakeRemote::with_quotes(&[
            quote("1", "B", ""),
            quote("2", "D", ""),
        ]));
        let (orch, store) = orchestrator(
            &[quote("1", "A", ""), quote("2", "C", "")],
            remote,
            ConflictPolicy::Manual,
        );

        orch.sync_now().await;
        assert_eq!(orch.pending_conflicts().len(), 2);

        let resolved = orch.resolve_all().unwrap();
        assert_eq!(resolved.len(), 2);
        assert!(orch.pending_conflicts().is_empty());
        assert_eq!(store.lock().get("2").unwrap().text, "D");
    }

    #[tokio::test]
    async fn test_status_events_emitted() {
        let remote = Arc::new(FakeRemote::default());
        let notifier = Notifier::new();
        let store = store_with(&[], &notifier);
        let mut rx = notifier.subscribe();
        let orch = SyncOrchestrator::new(store, remote, ConflictPolicy::RemoteWins, notifier);

        orch.sync_now().await;

        let mut phases = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let DeckEvent::SyncStatusChanged(status) = event {
                phases.push(status.phase);
            }
        }
        assert_eq!(phases, vec![SyncPhase::Syncing, SyncPhase::Idle]);
    }
}
