use serde::{Deserialize, Serialize};
use std::fmt;

use super::QuoteRecord;

/// Sentinel stored for "every quote".
pub const FILTER_ALL: &str = "all";
/// Sentinel stored for "quotes without a category".
pub const FILTER_UNCATEGORIZED: &str = "uncategorized";

/// Category filter applied to listings and random selection.
///
/// Persisted as a plain string: a category name or one of the sentinels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CategoryFilter {
    #[default]
    All,
    Uncategorized,
    Category(String),
}

impl CategoryFilter {
    /// Parses a stored filter value. Blank values mean `All`.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | FILTER_ALL => CategoryFilter::All,
            FILTER_UNCATEGORIZED => CategoryFilter::Uncategorized,
            other => CategoryFilter::Category(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CategoryFilter::All => FILTER_ALL,
            CategoryFilter::Uncategorized => FILTER_UNCATEGORIZED,
            CategoryFilter::Category(name) => name,
        }
    }

    pub fn matches(&self, quote: &QuoteRecord) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Uncategorized => quote.is_uncategorized(),
            CategoryFilter::Category(name) => quote.category.trim() == name,
        }
    }

    /// A filter is still selectable when at least one quote could match it.
    /// `All` is always selectable.
    pub fn is_available_in(&self, quotes: &[QuoteRecord]) -> bool {
        match self {
            CategoryFilter::All => true,
            _ => quotes.iter().any(|q| self.matches(q)),
        }
    }
}

impl From<String> for CategoryFilter {
    fn from(value: String) -> Self {
        CategoryFilter::parse(&value)
    }
}

impl From<CategoryFilter> for String {
    fn from(filter: CategoryFilter) -> Self {
        filter.as_str().to_string()
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => write!(f, "All Categories"),
            CategoryFilter::Uncategorized => write!(f, "Uncategorized"),
            CategoryFilter::Category(name) => write!(f, "{}", name),
        }
    }
}

/// Sorted, distinct, non-empty categories present in `quotes`.
pub fn categories(quotes: &[QuoteRecord]) -> Vec<String> {
    let mut cats: Vec<String> = quotes
        .iter()
        .map(|q| q.category.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    cats.sort();
    cats.dedup();
    cats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<QuoteRecord> {
        vec![
            QuoteRecord::new("a").with_category("Mindset"),
            QuoteRecord::new("b").with_category("Innovation"),
            QuoteRecord::new("c"),
            QuoteRecord::new("d").with_category("Mindset"),
        ]
    }

    #[test]
    fn test_parse_sentinels() {
        assert_eq!(CategoryFilter::parse("all"), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse(""), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::parse("uncategorized"),
            CategoryFilter::Uncategorized
        );
        assert_eq!(
            CategoryFilter::parse(" Mindset "),
            CategoryFilter::Category("Mindset".into())
        );
    }

    #[test]
    fn test_as_str_roundtrip() {
        for filter in [
            CategoryFilter::All,
            CategoryFilter::Uncategorized,
            CategoryFilter::Category("Wisdom".into()),
        ] {
            assert_eq!(CategoryFilter::parse(filter.as_str()), filter);
        }
    }

    #[test]
    fn test_matches() {
        let quotes = sample();
        let mindset = CategoryFilter::Category("Mindset".into());
        assert_eq!(quotes.iter().filter(|q| mindset.matches(q)).count(), 2);
        assert_eq!(
            quotes
                .iter()
                .filter(|q| CategoryFilter::Uncategorized.matches(q))
                .count(),
            1
        );
        assert!(quotes.iter().all(|q| CategoryFilter::All.matches(q)));
    }

    #[test]
    fn test_is_available_in() {
        let quotes = sample();
        assert!(CategoryFilter::All.is_available_in(&[]));
        assert!(CategoryFilter::Uncategorized.is_available_in(&quotes));
        assert!(!CategoryFilter::Category("Stoicism".into()).is_available_in(&quotes));
        assert!(!CategoryFilter::Uncategorized.is_available_in(&quotes[..2]));
    }

    #[test]
    fn test_categories_sorted_and_distinct() {
        assert_eq!(categories(&sample()), vec!["Innovation", "Mindset"]);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&CategoryFilter::Uncategorized).unwrap();
        assert_eq!(json, "\"uncategorized\"");
        let parsed: CategoryFilter = serde_json::from_str("\"Mindset\"").unwrap();
        assert_eq!(parsed, CategoryFilter::Category("Mindset".into()));
    }
}
