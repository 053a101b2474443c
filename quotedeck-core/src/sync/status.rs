use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fmt;

/// Phase of the sync state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    #[default]
    Idle,
    Syncing,
    Failed,
}

/// Snapshot of sync state reported to views.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub phase: SyncPhase,
    /// Completion time of the last successful cycle.
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Error from the most recent cycle, cleared by the next success.
    pub last_error: Option<String>,
    /// Items that could not be pushed during the last successful cycle.
    pub last_push_failures: usize,
}

impl SyncStatus {
    pub fn is_syncing(&self) -> bool {
        self.phase == SyncPhase::Syncing
    }

    pub fn has_failed(&self) -> bool {
        self.phase == SyncPhase::Failed || (self.phase == SyncPhase::Idle && self.last_error.is_some())
    }

    /// Short machine-friendly state: `idle`, `syncing` or `failed`.
    pub fn state(&self) -> &'static str {
        if self.is_syncing() {
            "syncing"
        } else if self.has_failed() {
            "failed"
        } else {
            "idle"
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_syncing() {
            return write!(f, "Syncing\u{2026}");
        }
        if let Some(error) = &self.last_error {
            return write!(f, "Sync failed: {}", error);
        }
        match self.last_sync_at {
            Some(at) => {
                write!(
                    f,
                    "Last sync: {}",
                    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
                )?;
                if self.last_push_failures > 0 {
                    write!(f, " ({} item(s) not pushed)", self.last_push_failures)?;
                }
                Ok(())
            }
            None => write!(f, "Never synced"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        let status = SyncStatus::default();
        assert_eq!(status.state(), "idle");
        assert_eq!(status.to_string(), "Never synced");
    }

    #[test]
    fn test_failed_state_survives_return_to_idle() {
        let status = SyncStatus {
            phase: SyncPhase::Idle,
            last_error: Some("Request failed: boom".into()),
            ..SyncStatus::default()
        };
        assert!(status.has_failed());
        assert_eq!(status.state(), "failed");
        assert!(status.to_string().contains("boom"));
    }

    #[test]
    fn test_syncing_label() {
        let status = SyncStatus {
            phase: SyncPhase::Syncing,
            ..SyncStatus::default()
        };
        assert_eq!(status.state(), "syncing");
        assert!(status.to_string().starts_with("Syncing"));
    }

    #[test]
    fn test_push_failures_in_label() {
        let status = SyncStatus {
            last_sync_at: Some(Utc::now()),
            last_push_failures: 2,
            ..SyncStatus::default()
        };
        assert!(status.to_string().contains("2 item(s) not pushed"));
    }
}
