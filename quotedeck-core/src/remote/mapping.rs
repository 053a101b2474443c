use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use super::RemoteItem;
use crate::models::{normalize, timestamp_now, QuoteFields, QuoteRecord, Source};

/// Metadata bundle serialized into a post body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetaBundle<'a> {
    author: &'a str,
    category: &'a str,
    updated_at: String,
    id: &'a str,
}

/// Maps a quote to the post sent on create.
pub fn to_remote(quote: &QuoteRecord) -> RemoteItem {
    let meta = MetaBundle {
        author: &quote.author,
        category: &quote.category,
        updated_at: quote
            .updated_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        id: &quote.id,
    };

    RemoteItem {
        id: remote_post_id(&quote.id),
        title: quote.text.clone(),
        body: serde_json::to_string(&meta).unwrap_or_default(),
        user_id: 1,
    }
}

/// Numeric post id derived from the last five digits of a quote id.
///
/// Returns `None` when the id has no digits or they are all zero.
pub fn remote_post_id(quote_id: &str) -> Option<u64> {
    let digits: Vec<char> = quote_id.chars().filter(char::is_ascii_digit).collect();
    let tail: String = digits[digits.len().saturating_sub(5)..].iter().collect();
    tail.parse::<u64>().ok().filter(|&n| n != 0)
}

/// Maps a fetched post back to a quote stamped `source = remote`.
///
/// A body that is not a JSON object is treated as an empty bundle. Posts
/// with an empty title yield `None`.
pub fn from_remote(item: &RemoteItem) -> Option<QuoteRecord> {
    let meta = match serde_json::from_str::<Value>(&item.body) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    let text_of = |key: &str| {
        meta.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let id = match meta.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => item.id.map(|n| format!("srv_{}", n)),
    };
    let updated_at = text_of("updatedAt")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(timestamp_now);

    let record = normalize(QuoteFields {
        id,
        text: item.title.clone(),
        author: text_of("author"),
        category: text_of("category"),
        updated_at: Some(updated_at),
        source: Some(Source::Remote),
    });
    if record.is_none() {
        tracing::debug!("Dropping remote item {:?} with empty title", item.id);
    }
    record
}
