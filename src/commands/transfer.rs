use clap::Subcommand;
use std::path::PathBuf;

use quotedeck_core::QuoteDeck;

use super::confirm;

#[derive(Subcommand)]
pub enum TransferCommand {
    /// Import quotes from a JSON file (an array of strings or objects)
    Import {
        /// File to read
        file: PathBuf,
    },

    /// Export all quotes as JSON
    Export {
        /// Output file (default: quotes-YYYY-MM-DD.json)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Delete every quote
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl TransferCommand {
    pub fn is_write(&self) -> bool {
        matches!(self, TransferCommand::Import { .. })
    }

    pub fn run(&self, deck: &QuoteDeck) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            TransferCommand::Import { file } => {
                let rt = tokio::runtime::Runtime::new()?;
                let summary = rt.block_on(deck.import_file(file))?;

                println!(
                    "Imported {} quote(s) from {}",
                    summary.imported,
                    file.display()
                );
                if summary.duplicates > 0 {
                    println!("  {} duplicate(s) skipped", summary.duplicates);
                }
                if summary.invalid > 0 {
                    println!("  {} invalid item(s) skipped", summary.invalid);
                }
                Ok(())
            }

            TransferCommand::Export { output } => {
                let path = output.clone().unwrap_or_else(default_export_path);
                let count = deck.export_all().len();
                std::fs::write(&path, deck.export_json()?)?;

                println!("Exported {} quote(s) to {}", count, path.display());
                Ok(())
            }

            TransferCommand::Clear { force } => {
                let count = deck.get_current().len();
                if count == 0 {
                    println!("No quotes to clear");
                    return Ok(());
                }

                if !force && !confirm(&format!("Delete all {} quote(s)?", count))? {
                    println!("Clear cancelled.");
                    return Ok(());
                }

                deck.clear_all()?;
                println!("Cleared {} quote(s)", count);
                Ok(())
            }
        }
    }
}

fn default_export_path() -> PathBuf {
    PathBuf::from(format!(
        "quotes-{}.json",
        chrono::Local::now().format("%Y-%m-%d")
    ))
}
