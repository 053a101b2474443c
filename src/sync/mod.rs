//! Wiring between the CLI configuration and the core deck.
//!
//! The persistent store lives in the configured data directory; the
//! session store lives under the OS temp directory.

pub mod auto_sync;

use std::sync::Arc;

use quotedeck_core::{FileStore, HttpRemote, QuoteDeck, StorageError};

use crate::config::Config;

pub use auto_sync::try_auto_sync;

/// HTTP remote built from the `remote:` settings.
pub fn remote_from_config(config: &Config) -> HttpRemote {
    HttpRemote::new(config.server_url.value.clone()).with_fetch_limit(config.fetch_limit)
}

/// Opens the deck backed by the configured directories.
pub fn open_deck(config: &Config) -> Result<QuoteDeck, StorageError> {
    tracing::debug!(
        "Opening quote store in {}",
        config.data_dir.value.display()
    );
    QuoteDeck::open(
        Box::new(FileStore::new(config.data_dir.value.clone())),
        Box::new(FileStore::new(Config::session_dir())),
        Arc::new(remote_from_config(config)),
        config.sync.conflict_policy,
    )
}
