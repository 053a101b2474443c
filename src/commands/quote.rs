use clap::Subcommand;

use quotedeck_core::{AddOutcome, CategoryFilter, QuoteDeck, QuoteFields, QuoteRecord};

use super::{confirm, truncate, OutputFormat};

#[derive(Subcommand)]
pub enum QuoteCommand {
    /// Add a quote
    Add {
        /// Quote text
        text: String,

        /// Who said it
        #[arg(long, short)]
        author: Option<String>,

        /// Category (omit for uncategorized)
        #[arg(long)]
        category: Option<String>,
    },

    /// List quotes
    List {
        /// Category to list: a name, "all" or "uncategorized" (default: saved filter)
        #[arg(long)]
        category: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a quote (default: the last one shown, else a random one)
    Show {
        /// Position in the list (1-based)
        #[arg(conflicts_with_all = ["random", "last"])]
        index: Option<usize>,

        /// Pick a random quote from the active filter
        #[arg(long, conflicts_with = "last")]
        random: bool,

        /// Show the last displayed quote
        #[arg(long)]
        last: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Remove a quote by id
    Remove {
        /// Quote id
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// List categories in use
    Categories {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show or set the saved category filter
    Filter {
        /// A category name, "all" or "uncategorized"
        value: Option<String>,
    },
}

impl QuoteCommand {
    /// Commands that change the collection and are worth pushing.
    pub fn is_write(&self) -> bool {
        matches!(self, QuoteCommand::Add { .. } | QuoteCommand::Remove { .. })
    }

    pub fn run(&self, deck: &QuoteDeck) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            QuoteCommand::Add {
                text,
                author,
                category,
            } => {
                let input = QuoteFields {
                    text: text.clone(),
                    author: author.clone(),
                    category: category.clone(),
                    ..QuoteFields::default()
                };
                match deck.add(input)? {
                    AddOutcome::Added(quote) => {
                        println!("Added quote {}:", quote.id);
                        println!("{}", quote);
                    }
                    AddOutcome::Duplicate => {
                        println!("Duplicate quote ignored (same text & author)");
                    }
                }
                Ok(())
            }

            QuoteCommand::List { category, format } => {
                let filter = match category {
                    Some(value) => CategoryFilter::parse(value),
                    None => deck.filter(),
                };
                // Numbered by position in the whole collection, which is what
                // `show <index>` takes.
                let rows: Vec<(usize, QuoteRecord)> = deck
                    .get_current()
                    .into_iter()
                    .enumerate()
                    .filter(|(_, q)| filter.matches(q))
                    .collect();

                if rows.is_empty() {
                    println!("No quotes found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        let quotes: Vec<&QuoteRecord> = rows.iter().map(|(_, q)| q).collect();
                        println!("{}", serde_json::to_string_pretty(&quotes)?);
                    }
                    OutputFormat::Text => print_table(&rows),
                }
                Ok(())
            }

            QuoteCommand::Show {
                index,
                random,
                last,
                format,
            } => {
                let quote = if let Some(index) = index {
                    if *index == 0 || *index > deck.get_current().len() {
                        return Err(format!("No quote at position {}", index).into());
                    }
                    deck.show_at(index - 1)
                } else if *random {
                    deck.show_random()
                } else if *last {
                    deck.last_viewed()
                } else {
                    deck.last_viewed().or_else(|| deck.show_random())
                };

                let Some(quote) = quote else {
                    println!("No quotes to show");
                    return Ok(());
                };
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&quote)?),
                    OutputFormat::Text => println!("{}", quote),
                }
                Ok(())
            }

            QuoteCommand::Remove { id, force } => {
                let Some(quote) = deck.get_current().into_iter().find(|q| &q.id == id) else {
                    return Err(format!("Quote not found: {}", id).into());
                };

                if !force && !confirm(&format!("Remove {}?", quote))? {
                    println!("Removal cancelled.");
                    return Ok(());
                }

                deck.remove(id)?;
                println!("Removed quote: {}", id);
                Ok(())
            }

            QuoteCommand::Categories { format } => {
                let categories = deck.categories();
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&categories)?);
                    }
                    OutputFormat::Text => {
                        if categories.is_empty() {
                            println!("No categories");
                        }
                        for category in &categories {
                            println!("{}", category);
                        }
                    }
                }
                Ok(())
            }

            QuoteCommand::Filter { value } => {
                let Some(value) = value else {
                    println!("Filter: {}", deck.filter());
                    let categories = deck.categories();
                    if !categories.is_empty() {
                        println!("Categories: {}", categories.join(", "));
                    }
                    return Ok(());
                };

                let requested = CategoryFilter::parse(value);
                let applied = deck.set_filter(requested.clone())?;
                if applied != requested {
                    println!("No quotes in '{}'; showing all quotes", requested);
                }
                println!("Filter: {}", applied);
                Ok(())
            }
        }
    }
}

fn print_table(rows: &[(usize, QuoteRecord)]) {
    println!(
        "{:<4}  {:<24}  {:<20}  {:<14}  TEXT",
        "#", "ID", "AUTHOR", "CATEGORY"
    );
    println!("{}", "-".repeat(100));
    for (i, quote) in rows {
        println!(
            "{:<4}  {:<24}  {:<20}  {:<14}  {}",
            i + 1,
            truncate(&quote.id, 24),
            truncate(&quote.author, 20),
            truncate(&quote.category, 14),
            truncate(&quote.text, 60)
        );
    }
    println!("\nTotal: {} quote(s)", rows.len());
}
