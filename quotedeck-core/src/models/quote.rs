use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::ValidationError;

/// Where a record's current version came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Local,
    #[serde(alias = "server")]
    Remote,
}

impl Source {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "local" => Some(Source::Local),
            "remote" | "server" => Some(Source::Remote),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Local => write!(f, "local"),
            Source::Remote => write!(f, "remote"),
        }
    }
}

/// A single stored quotation.
///
/// Records are only built through [`normalize`] or the constructors here, so
/// `text` is always trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub category: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub source: Source,
}

impl QuoteRecord {
    /// Creates a local record with a fresh id and timestamp.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            text: text.into().trim().to_string(),
            author: String::new(),
            category: String::new(),
            updated_at: timestamp_now(),
            source: Source::Local,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into().trim().to_string();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into().trim().to_string();
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub fn is_uncategorized(&self) -> bool {
        self.category.trim().is_empty()
    }

    /// Case-insensitive `(text, author)` pair used as the fallback dedup key.
    pub fn content_key(&self) -> (String, String) {
        (self.text.to_lowercase(), self.author.to_lowercase())
    }

    /// Exact comparison of the user-visible fields.
    pub fn same_content(&self, other: &QuoteRecord) -> bool {
        self.text == other.text && self.author == other.author && self.category == other.category
    }
}

impl fmt::Display for QuoteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\u{201c}{}\u{201d}", self.text)?;
        if self.author.is_empty() {
            write!(f, " \u{2014} Unknown")?;
        } else {
            write!(f, " \u{2014} {}", self.author)?;
        }
        if self.is_uncategorized() {
            write!(f, " [Uncategorized]")
        } else {
            write!(f, " [{}]", self.category)
        }
    }
}

/// Explicit fields for a record that has not been normalized yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteFields {
    pub id: Option<String>,
    pub text: String,
    pub author: Option<String>,
    pub category: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub source: Option<Source>,
}

/// Raw input accepted by [`normalize`]: a bare string or structured fields.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteInput {
    Text(String),
    Fields(QuoteFields),
}

impl QuoteInput {
    /// Validates an arbitrary JSON value and converts it into an input.
    ///
    /// Numeric ids are stringified. Unknown `source` values and unparseable
    /// timestamps are treated as absent.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        check(value)?;

        let obj = match value {
            Value::Object(obj) => obj,
            other => {
                return Ok(QuoteInput::Text(
                    other.as_str().unwrap_or_default().to_string(),
                ))
            }
        };

        let id = match obj.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let updated_at = obj
            .get("updatedAt")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let source = obj
            .get("source")
            .and_then(Value::as_str)
            .and_then(Source::parse);

        Ok(QuoteInput::Fields(QuoteFields {
            id,
            text: string_field(obj, "text").unwrap_or_default(),
            author: string_field(obj, "author"),
            category: string_field(obj, "category"),
            updated_at,
            source,
        }))
    }
}

fn string_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

impl From<&str> for QuoteInput {
    fn from(text: &str) -> Self {
        QuoteInput::Text(text.to_string())
    }
}

impl From<String> for QuoteInput {
    fn from(text: String) -> Self {
        QuoteInput::Text(text)
    }
}

impl From<QuoteFields> for QuoteInput {
    fn from(fields: QuoteFields) -> Self {
        QuoteInput::Fields(fields)
    }
}

impl From<QuoteRecord> for QuoteInput {
    fn from(record: QuoteRecord) -> Self {
        QuoteInput::Fields(QuoteFields {
            id: Some(record.id),
            text: record.text,
            author: Some(record.author),
            category: Some(record.category),
            updated_at: Some(record.updated_at),
            source: Some(record.source),
        })
    }
}

/// Returns true if `value` can be normalized into a quote.
pub fn validate(value: &Value) -> bool {
    check(value).is_ok()
}

fn check(value: &Value) -> Result<(), ValidationError> {
    match value {
        Value::String(s) if s.trim().is_empty() => Err(ValidationError::EmptyText),
        Value::String(_) => Ok(()),
        Value::Object(obj) => {
            match obj.get("text") {
                Some(Value::String(s)) if !s.trim().is_empty() => {}
                Some(Value::String(_)) | Some(Value::Null) | None => {
                    return Err(ValidationError::EmptyText)
                }
                Some(_) => return Err(ValidationError::InvalidField("text")),
            }
            for field in ["author", "category"] {
                match obj.get(field) {
                    None | Some(Value::Null) | Some(Value::String(_)) => {}
                    Some(_) => return Err(ValidationError::InvalidField(field)),
                }
            }
            Ok(())
        }
        Value::Null => Err(ValidationError::UnsupportedShape("null")),
        Value::Bool(_) => Err(ValidationError::UnsupportedShape("a boolean")),
        Value::Number(_) => Err(ValidationError::UnsupportedShape("a number")),
        Value::Array(_) => Err(ValidationError::UnsupportedShape("an array")),
    }
}

/// Builds a canonical record from raw input.
///
/// Returns `None` when the trimmed text is empty; such records are discarded.
pub fn normalize(input: impl Into<QuoteInput>) -> Option<QuoteRecord> {
    let fields = match input.into() {
        QuoteInput::Text(text) => QuoteFields {
            text,
            ..QuoteFields::default()
        },
        QuoteInput::Fields(fields) => fields,
    };

    let text = fields.text.trim();
    if text.is_empty() {
        return None;
    }

    let id = fields
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(generate_id);

    Some(QuoteRecord {
        id,
        text: text.to_string(),
        author: fields.author.as_deref().unwrap_or("").trim().to_string(),
        category: fields.category.as_deref().unwrap_or("").trim().to_string(),
        updated_at: fields.updated_at.unwrap_or_else(timestamp_now),
        source: fields.source.unwrap_or_default(),
    })
}

/// Generates a record id of the form `q_<base36 millis>_<6 base36 chars>`.
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let mut rng = rand::rng();
    let suffix: String = (0..6)
        .map(|_| base36_digit(rng.random_range(0..36)))
        .collect();
    format!("q_{}_{}", to_base36(millis), suffix)
}

/// Current time truncated to millisecond precision.
pub(crate) fn timestamp_now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(base36_digit((n % 36) as u32));
        n /= 36;
    }
    digits.iter().rev().collect()
}

fn base36_digit(d: u32) -> char {
    std::char::from_digit(d, 36).unwrap_or('0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_bare_string() {
        let q = normalize("  Stay hungry.  ").unwrap();
        assert_eq!(q.text, "Stay hungry.");
        assert_eq!(q.author, "");
        assert_eq!(q.category, "");
        assert_eq!(q.source, Source::Local);
        assert!(q.id.starts_with("q_"));
    }

    #[test]
    fn test_normalize_trims_fields() {
        let q = normalize(QuoteFields {
            text: " What we think, we become. ".into(),
            author: Some("  Buddha ".into()),
            category: Some(" Mindset  ".into()),
            ..QuoteFields::default()
        })
        .unwrap();
        assert_eq!(q.text, "What we think, we become.");
        assert_eq!(q.author, "Buddha");
        assert_eq!(q.category, "Mindset");
    }

    #[test]
    fn test_normalize_keeps_supplied_id_and_timestamp() {
        let ts = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let q = normalize(QuoteFields {
            id: Some("abc".into()),
            text: "Hi".into(),
            updated_at: Some(ts),
            source: Some(Source::Remote),
            ..QuoteFields::default()
        })
        .unwrap();
        assert_eq!(q.id, "abc");
        assert_eq!(q.updated_at, ts);
        assert_eq!(q.source, Source::Remote);
    }

    #[test]
    fn test_normalize_replaces_empty_id() {
        let q = normalize(QuoteFields {
            id: Some(String::new()),
            text: "Hi".into(),
            ..QuoteFields::default()
        })
        .unwrap();
        assert!(q.id.starts_with("q_"));
    }

    #[test]
    fn test_normalize_discards_empty_text() {
        assert!(normalize("   ").is_none());
        assert!(normalize(QuoteFields::default()).is_none());
    }

    #[test]
    fn test_validate() {
        assert!(validate(&json!("hello")));
        assert!(validate(&json!({"text": "hello"})));
        assert!(validate(&json!({"text": "hello", "author": null})));
        assert!(validate(&json!({"text": "hello", "author": "A", "category": "C"})));

        assert!(!validate(&json!("  ")));
        assert!(!validate(&json!({"text": ""})));
        assert!(!validate(&json!({"author": "A"})));
        assert!(!validate(&json!({"text": 5})));
        assert!(!validate(&json!({"text": "x", "author": 3})));
        assert!(!validate(&json!({"text": "x", "category": ["a"]})));
        assert!(!validate(&json!(42)));
        assert!(!validate(&json!(null)));
    }

    #[test]
    fn test_from_value_reports_invalid_field() {
        let err = QuoteInput::from_value(&json!({"text": "x", "author": 1})).unwrap_err();
        assert_eq!(err, ValidationError::InvalidField("author"));
    }

    #[test]
    fn test_from_value_numeric_id_and_legacy_source() {
        let input = QuoteInput::from_value(&json!({
            "id": 17,
            "text": "Numbers",
            "updatedAt": "2024-01-02T03:04:05.000Z",
            "source": "server"
        }))
        .unwrap();
        let q = normalize(input).unwrap();
        assert_eq!(q.id, "17");
        assert_eq!(q.source, Source::Remote);
        assert_eq!(q.updated_at.to_rfc3339(), "2024-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_from_value_bad_timestamp_is_replaced() {
        let input = QuoteInput::from_value(&json!({"text": "x", "updatedAt": "yesterday"})).unwrap();
        let q = normalize(input).unwrap();
        assert!(q.updated_at <= Utc::now());
    }

    #[test]
    fn test_generate_id_is_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        let parts: Vec<&str> = a.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].len(), 6);
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_record_json_roundtrip() {
        let q = QuoteRecord::new("Simplicity is the soul of efficiency.")
            .with_author("Austin Freeman")
            .with_category("Productivity")
            .with_source(Source::Remote);

        let json = serde_json::to_string(&q).unwrap();
        assert!(json.contains("\"updatedAt\""));
        assert!(json.contains("\"source\":\"remote\""));
        let parsed: QuoteRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(q, parsed);
    }

    #[test]
    fn test_same_content_and_content_key() {
        let a = QuoteRecord::new("Hello").with_author("Bob");
        let b = QuoteRecord::new("HELLO").with_author("bob");
        assert!(!a.same_content(&b));
        assert_eq!(a.content_key(), b.content_key());
    }

    #[test]
    fn test_display() {
        let q = QuoteRecord::new("Be kind").with_author("Anon");
        let out = q.to_string();
        assert!(out.contains("Be kind"));
        assert!(out.contains("Anon"));
        assert!(out.contains("[Uncategorized]"));
    }
}
