//! Deduplication and merging of quote collections.
//!
//! Two records are duplicates when they share an `id` or when their
//! case-insensitive `(text, author)` pair matches. The content pair applies
//! even when both records carry distinct ids, so re-importing the same quote
//! under a fresh id is still a duplicate. The first occurrence always wins;
//! later duplicates are dropped, never merged in.

use std::collections::HashSet;

use crate::models::QuoteRecord;

/// Returns `records` with every later duplicate removed, preserving order.
pub fn dedupe(records: impl IntoIterator<Item = QuoteRecord>) -> Vec<QuoteRecord> {
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_content: HashSet<(String, String)> = HashSet::new();
    let mut out = Vec::new();

    for record in records {
        let key = record.content_key();
        if seen_ids.contains(&record.id) || seen_content.contains(&key) {
            continue;
        }
        seen_ids.insert(record.id.clone());
        seen_content.insert(key);
        out.push(record);
    }

    out
}

/// Local records whose id does not appear in `remote`.
pub fn local_only(remote: &[QuoteRecord], local: &[QuoteRecord]) -> Vec<QuoteRecord> {
    let remote_ids: HashSet<&str> = remote.iter().map(|q| q.id.as_str()).collect();
    local
        .iter()
        .filter(|q| !remote_ids.contains(q.id.as_str()))
        .cloned()
        .collect()
}

/// Unions a remote snapshot with the local collection.
///
/// Remote is authoritative by id: on an id collision the remote record is
/// kept. Local-only records follow the remote ones.
pub fn merge(remote: &[QuoteRecord], local: &[QuoteRecord]) -> Vec<QuoteRecord> {
    let local_only = local_only(remote, local);
    dedupe(remote.iter().cloned().chain(local_only))
}
