use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod sync;

use commands::{ConfigCommand, QuoteCommand, SyncCommand, TransferCommand};
use config::Config;
use sync::{open_deck, try_auto_sync};

#[derive(Parser)]
#[command(name = "quotedeck")]
#[command(version)]
#[command(about = "A local-first quote collection with remote sync", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log sync activity to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Quote(QuoteCommand),

    #[command(flatten)]
    Transfer(TransferCommand),

    /// Sync with the remote server
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Save config path for init command
    let cli_config_path = cli.config.clone();

    let config = Config::load(cli.config)?;

    match &cli.command {
        Some(Commands::Quote(cmd)) => {
            let deck = open_deck(&config)?;
            cmd.run(&deck)?;
            if cmd.is_write() {
                try_auto_sync(&config, &deck);
            }
        }
        Some(Commands::Transfer(cmd)) => {
            let deck = open_deck(&config)?;
            cmd.run(&deck)?;
            if cmd.is_write() {
                try_auto_sync(&config, &deck);
            }
        }
        Some(Commands::Sync(cmd)) => {
            let deck = open_deck(&config)?;
            cmd.run(&config, &deck)?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config, cli_config_path)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

/// Logs go to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("quotedeck={0},quotedeck_core={0}", default_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
