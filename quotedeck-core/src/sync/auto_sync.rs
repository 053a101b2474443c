use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::orchestrator::{SyncOrchestrator, SyncOutcome};

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(20);

/// Periodic sync trigger. The first cycle starts immediately.
///
/// Dropping the handle stops the timer. A cycle already in flight is not
/// cancelled; it runs on its own task and completes normally.
pub struct AutoSync {
    timer: JoinHandle<()>,
}

impl AutoSync {
    /// Must be called from within a Tokio runtime.
    pub fn start(orchestrator: Arc<SyncOrchestrator>, interval: Duration) -> Self {
        let timer = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                    if let SyncOutcome::Skipped = orchestrator.sync_now().await {
                        tracing::debug!("Auto-sync tick skipped: previous cycle still running");
                    }
                });
            }
        });
        tracing::debug!("Auto-sync started every {:?}", interval);
        Self { timer }
    }

    pub fn stop(self) {
        self.timer.abort();
    }
}

impl Drop for AutoSync {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::events::Notifier;
    use crate::remote::{CreateAck, RemoteCollection, RemoteItem};
    use crate::storage::{KeyValueStore, MemoryStore, QuoteStore, SharedStore, QUOTES_KEY};
    use crate::sync::ConflictPolicy;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRemote {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl RemoteCollection for CountingRemote {
        async fn fetch_all(&self) -> Result<Vec<RemoteItem>, TransportError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn create(&self, _item: &RemoteItem) -> Result<CreateAck, TransportError> {
            Ok(CreateAck { remote_id: None })
        }
    }

    fn orchestrator(remote: Arc<CountingRemote>) -> Arc<SyncOrchestrator> {
        let notifier = Notifier::new();
        let mut persistent = MemoryStore::new();
        persistent.set(QUOTES_KEY, "[]").unwrap();
        let store = QuoteStore::open(
            Box::new(persistent),
            Box::new(MemoryStore::new()),
            notifier.clone(),
        )
        .unwrap();
        Arc::new(SyncOrchestrator::new(
            SharedStore::new(store),
            remote,
            ConflictPolicy::RemoteWins,
            notifier,
        ))
    }

    #[tokio::test]
    async fn test_ticks_until_dropped() {
        let remote = Arc::new(CountingRemote::default());
        let auto = AutoSync::start(orchestrator(remote.clone()), Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(remote.fetches.load(Ordering::SeqCst) >= 2);

        auto.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_stop = remote.fetches.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(remote.fetches.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_first_tick_is_immediate() {
        let remote = Arc::new(CountingRemote::default());
        let _auto = AutoSync::start(orchestrator(remote.clone()), Duration::from_secs(3600));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(remote.fetches.load(Ordering::SeqCst), 1);
    }
}
