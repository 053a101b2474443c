//! Change notifications for views that render the store.

use tokio::sync::broadcast;

use crate::models::CategoryFilter;
use crate::sync::SyncStatus;

const CHANNEL_CAPACITY: usize = 64;

/// Events emitted whenever observable state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum DeckEvent {
    /// The quote collection was written.
    QuotesChanged { count: usize },
    /// The active category filter changed.
    FilterChanged(CategoryFilter),
    /// A different quote is now displayed.
    CurrentChanged { index: usize },
    /// The sync state machine moved.
    SyncStatusChanged(SyncStatus),
    /// The pending conflict list changed.
    ConflictsChanged { pending: usize },
}

/// Broadcast sender shared by the store and the sync orchestrator.
///
/// Emitting with no subscribers is not an error; slow subscribers may lag
/// and miss events.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<DeckEvent>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeckEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: DeckEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers() {
        let notifier = Notifier::new();
        notifier.emit(DeckEvent::QuotesChanged { count: 1 });
    }

    #[test]
    fn test_subscribers_receive_events() {
        let notifier = Notifier::new();
        let mut rx1 = notifier.subscribe();
        let mut rx2 = notifier.clone().subscribe();

        notifier.emit(DeckEvent::ConflictsChanged { pending: 2 });

        assert_eq!(
            rx1.try_recv().unwrap(),
            DeckEvent::ConflictsChanged { pending: 2 }
        );
        assert_eq!(
            rx2.try_recv().unwrap(),
            DeckEvent::ConflictsChanged { pending: 2 }
        );
        assert!(rx1.try_recv().is_err());
    }
}
