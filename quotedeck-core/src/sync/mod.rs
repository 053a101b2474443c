//! Pull/merge/push synchronization with the remote collection.

mod auto_sync;
mod conflict;
mod orchestrator;
mod status;

pub use auto_sync::{AutoSync, DEFAULT_SYNC_INTERVAL};
pub use conflict::{
    detect_conflicts, resolve_auto, resolve_manual, ConflictEntry, ConflictLog, ConflictPolicy,
    Resolution,
};
pub use orchestrator::{PushFailure, SyncOrchestrator, SyncOutcome, SyncReport};
pub use status::{SyncPhase, SyncStatus};
