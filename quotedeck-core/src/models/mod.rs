mod filter;
mod quote;

pub use filter::{categories, CategoryFilter, FILTER_ALL, FILTER_UNCATEGORIZED};
pub use quote::{generate_id, normalize, validate, QuoteFields, QuoteInput, QuoteRecord, Source};

pub(crate) use quote::timestamp_now;
