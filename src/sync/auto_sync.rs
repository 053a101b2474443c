//! Auto-sync after write commands when `sync.auto_sync` is enabled.

use quotedeck_core::{check_server, QuoteDeck, SyncOutcome};

use crate::config::Config;

/// Runs one sync cycle if auto-sync is enabled and the server is reachable.
///
/// Failures are reported on stderr and never fail the command that
/// triggered them; the CLI keeps working offline.
pub fn try_auto_sync(config: &Config, deck: &QuoteDeck) {
    if !config.sync.auto_sync {
        return;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(_) => return,
    };

    rt.block_on(async {
        if !check_server(&config.server_url.value).await {
            eprintln!("Auto-sync: server unreachable, skipping");
            return;
        }

        match deck.sync_now().await {
            SyncOutcome::Failed(e) => eprintln!("Auto-sync: {}", e),
            SyncOutcome::PartialSuccess { push_failures, .. } => {
                eprintln!("Auto-sync: {} quote(s) could not be pushed", push_failures.len())
            }
            SyncOutcome::Completed(_) | SyncOutcome::Skipped => {}
        }

        // No one to ask here, so manual-policy conflicts take the remote side.
        match deck.resolve_all() {
            Ok(resolved) if !resolved.is_empty() => eprintln!(
                "Auto-sync: {} conflict(s) resolved with the remote version",
                resolved.len()
            ),
            Ok(_) => {}
            Err(e) => eprintln!("Auto-sync: {}", e),
        }
    });
}
