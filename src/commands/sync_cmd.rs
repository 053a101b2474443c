//! Sync CLI commands for synchronizing with the remote collection.

use clap::{Args, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::time::Duration;

use quotedeck_core::{
    check_server, ConflictEntry, ConflictPolicy, DeckEvent, QuoteDeck, Resolution, SyncOutcome,
    SyncStatus,
};
use tokio::sync::broadcast::error::RecvError;

use crate::config::Config;

/// Sync with the remote server
#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,

    /// Resolve every conflict this way instead of asking
    #[arg(long, value_enum)]
    keep: Option<KeepChoice>,
}

#[derive(Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration and server status
    Status,

    /// Keep syncing on a timer until interrupted
    Watch {
        /// Seconds between cycles (default: sync.interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KeepChoice {
    Local,
    Remote,
}

impl From<KeepChoice> for Resolution {
    fn from(choice: KeepChoice) -> Self {
        match choice {
            KeepChoice::Local => Resolution::KeepLocal,
            KeepChoice::Remote => Resolution::KeepRemote,
        }
    }
}

impl SyncCommand {
    pub fn run(
        &self,
        config: &Config,
        deck: &QuoteDeck,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let rt = tokio::runtime::Runtime::new()?;

        match &self.command {
            None => rt.block_on(self.sync(config, deck)),
            Some(SyncSubcommand::Status) => rt.block_on(self.status(config)),
            Some(SyncSubcommand::Watch { interval }) => {
                let interval = interval
                    .map(|secs| Duration::from_secs(secs.max(1)))
                    .unwrap_or_else(|| config.sync.interval());
                rt.block_on(self.watch(deck, interval))
            }
        }
    }

    async fn sync(
        &self,
        config: &Config,
        deck: &QuoteDeck,
    ) -> Result<(), Box<dyn std::error::Error>> {
        println!("Syncing with {}...", config.server_url.value);
        println!();

        match deck.sync_now().await {
            SyncOutcome::Completed(report) => {
                println!(
                    "  \u{2713} {} fetched, {} pushed, {} quote(s) locally",
                    report.fetched, report.pushed, report.merged
                );
            }
            SyncOutcome::PartialSuccess {
                report,
                push_failures,
            } => {
                println!(
                    "  \u{2713} {} fetched, {} pushed, {} quote(s) locally",
                    report.fetched, report.pushed, report.merged
                );
                for failure in &push_failures {
                    println!("  \u{2717} push {} - {}", failure.quote_id, failure.error);
                }
            }
            SyncOutcome::Failed(e) => return Err(e.into()),
            SyncOutcome::Skipped => {
                println!("Sync already in progress.");
                return Ok(());
            }
        }

        let pending = deck.pending_conflicts();
        if pending.is_empty() {
            let resolved = deck.conflict_history();
            if !resolved.is_empty() && config.sync.conflict_policy == ConflictPolicy::RemoteWins {
                println!();
                println!("{} conflict(s) resolved with the remote version", resolved.len());
            }
        } else {
            println!();
            println!("{} conflict(s) to resolve", pending.len());
            for conflict in &pending {
                println!();
                print_conflict(conflict);
                let choice = match self.keep {
                    Some(keep) => keep.into(),
                    None => ask_resolution()?,
                };
                deck.resolve(&conflict.id, choice)?;
                println!("  resolved: {}", resolution_label(choice));
            }
        }

        println!();
        println!("Sync complete.");
        Ok(())
    }

    async fn status(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        println!(
            "Server:          {} ({})",
            config.server_url.value, config.server_url.source
        );
        println!("Fetch limit:     {}", config.fetch_limit);
        println!(
            "Auto-sync:       {}",
            if config.sync.auto_sync {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!("Interval:        {}s", config.sync.interval().as_secs());
        println!(
            "Conflict policy: {}",
            policy_label(config.sync.conflict_policy)
        );
        println!();

        print!("Server status: ");
        io::stdout().flush()?;
        if check_server(&config.server_url.value).await {
            println!("\u{2713} reachable");
        } else {
            println!("\u{2717} unreachable");
        }

        Ok(())
    }

    async fn watch(
        &self,
        deck: &QuoteDeck,
        interval: Duration,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut events = deck.subscribe();
        let auto = deck.start_auto_sync(interval);
        println!(
            "Syncing every {}s. Press Ctrl-C to stop.",
            interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                event = events.recv() => match event {
                    Ok(DeckEvent::SyncStatusChanged(status)) => print_status(&status),
                    Ok(DeckEvent::ConflictsChanged { pending }) if pending > 0 => {
                        println!("{} conflict(s) pending", pending);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                },
            }
        }
        auto.stop();

        // The merge already holds the remote side of anything unresolved.
        let resolved = deck.resolve_all()?;
        if !resolved.is_empty() {
            println!(
                "{} conflict(s) left with the remote version",
                resolved.len()
            );
        }
        println!("Stopped.");
        Ok(())
    }
}

fn print_status(status: &SyncStatus) {
    if !status.is_syncing() {
        println!("[{}] {}", status.state(), status);
    }
}

fn print_conflict(conflict: &ConflictEntry) {
    println!("Conflict on {}", conflict.id);
    match &conflict.local_version {
        Some(quote) => println!("  local:  {}", quote),
        None => println!("  local:  (missing)"),
    }
    match &conflict.remote_version {
        Some(quote) => println!("  remote: {}", quote),
        None => println!("  remote: (missing)"),
    }
}

fn ask_resolution() -> io::Result<Resolution> {
    print!("  Keep [l]ocal or [r]emote? [r] ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(parse_resolution(&input))
}

fn parse_resolution(input: &str) -> Resolution {
    match input.trim().to_lowercase().as_str() {
        "l" | "local" => Resolution::KeepLocal,
        _ => Resolution::KeepRemote,
    }
}

fn resolution_label(resolution: Resolution) -> &'static str {
    match resolution {
        Resolution::KeepLocal => "kept local",
        Resolution::KeepRemote => "kept remote",
    }
}

fn policy_label(policy: ConflictPolicy) -> &'static str {
    match policy {
        ConflictPolicy::RemoteWins => "remote-wins",
        ConflictPolicy::Manual => "manual",
    }
}
