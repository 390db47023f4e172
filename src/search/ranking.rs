//! Result deduplication and relevance ordering

use super::normalize::normalize;
use crate::records::SchoolRecord;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Relevance tier of a name against the normalized query
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    /// Normalized name equals the normalized query
    Exact,
    /// Normalized name starts with the normalized query
    Prefix,
    Other,
}

impl MatchTier {
    pub fn of(normalized_name: &str, normalized_query: &str) -> Self {
        if normalized_name == normalized_query {
            MatchTier::Exact
        } else if normalized_name.starts_with(normalized_query) {
            MatchTier::Prefix
        } else {
            MatchTier::Other
        }
    }
}

/// Keep the first record for every CUE, preserving order
pub fn dedup_by_cue(records: Vec<SchoolRecord>) -> Vec<SchoolRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.cue))
        .collect()
}

/// Accent- and case-folded comparison, falling back to the raw names
fn collate(a: &str, a_folded: &str, b: &str, b_folded: &str) -> Ordering {
    a_folded.cmp(b_folded).then_with(|| a.cmp(b))
}

/// Sort records by relevance to `query`: exact name first, then names
/// starting with the query, then everything else; names compare
/// alphabetically within each tier. The sort is stable.
pub fn sort_by_relevance(records: &mut Vec<SchoolRecord>, query: &str) {
    let normalized_query = normalize(query.trim());

    let mut keyed: Vec<(MatchTier, String, SchoolRecord)> = records
        .drain(..)
        .map(|record| {
            let folded = normalize(&record.nombre);
            (MatchTier::of(&folded, &normalized_query), folded, record)
        })
        .collect();

    keyed.sort_by(|(tier_a, folded_a, a), (tier_b, folded_b, b)| {
        tier_a
            .cmp(tier_b)
            .then_with(|| collate(&a.nombre, folded_a, &b.nombre, folded_b))
    });

    records.extend(keyed.into_iter().map(|(_, _, record)| record));
}

/// Deduplicate then rank
pub fn finalize(records: Vec<SchoolRecord>, query: &str) -> Vec<SchoolRecord> {
    let mut records = dedup_by_cue(records);
    sort_by_relevance(&mut records, query);
    records
}
