//! Ranked name search over a catalog snapshot.
//!
//! Every candidate is placed in the highest tier it qualifies for; results
//! are ordered by tier, then case-insensitive name, then path. Searching is
//! synchronous and never touches anything but the snapshot it is given.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::core::artifact::ArtifactRecord;
use crate::core::catalog::Catalog;

/// How a record matched a query, best first when sorted descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    /// Query characters appear in order in the name
    Fuzzy = 10,
    PathContains = 25,
    IdentityContains = 50,
    NameContains = 100,
    NamePrefix = 500,
    ExactName = 1000,
}

impl MatchTier {
    pub fn score(self) -> u32 {
        self as u32
    }
}

/// One ranked result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub record: Arc<ArtifactRecord>,
    pub tier: MatchTier,
}

/// The search engine that ranks catalog entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct RankedSearchEngine;

impl RankedSearchEngine {
    pub fn new() -> Self {
        Self
    }

    /// Ordered records matching `query`. An empty query matches nothing.
    pub fn search(&self, catalog: &Catalog, query: &str) -> Vec<Arc<ArtifactRecord>> {
        self.search_hits(catalog, query)
            .into_iter()
            .map(|hit| hit.record)
            .collect()
    }

    /// Like [`search`](Self::search), keeping at most `limit` results.
    pub fn search_limited(
        &self,
        catalog: &Catalog,
        query: &str,
        limit: usize,
    ) -> Vec<Arc<ArtifactRecord>> {
        let mut results = self.search(catalog, query);
        results.truncate(limit);
        results
    }

    /// Ordered hits with the tier each one matched in.
    pub fn search_hits(&self, catalog: &Catalog, query: &str) -> Vec<SearchHit> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let query_lower = query.to_lowercase();
        let mut hits: Vec<(SearchHit, String)> = catalog
            .iter()
            .filter_map(|record| {
                let name_lower = record.name.to_lowercase();
                let tier = classify(record, &name_lower, &query_lower)?;
                Some((
                    SearchHit {
                        record: Arc::clone(record),
                        tier,
                    },
                    name_lower,
                ))
            })
            .collect();

        hits.sort_by(|(a, a_name), (b, b_name)| compare(a, a_name, b, b_name));
        hits.into_iter().map(|(hit, _)| hit).collect()
    }
}

/// Highest tier `record` qualifies for; both strings already lowercased.
fn classify(record: &ArtifactRecord, name_lower: &str, query_lower: &str) -> Option<MatchTier> {
    if name_lower == query_lower {
        return Some(MatchTier::ExactName);
    }
    if name_lower.starts_with(query_lower) {
        return Some(MatchTier::NamePrefix);
    }
    if name_lower.contains(query_lower) {
        return Some(MatchTier::NameContains);
    }
    if record
        .identity
        .as_ref()
        .is_some_and(|id| id.to_lowercase().contains(query_lower))
    {
        return Some(MatchTier::IdentityContains);
    }
    if record
        .path
        .to_string_lossy()
        .to_lowercase()
        .contains(query_lower)
    {
        return Some(MatchTier::PathContains);
    }
    if is_subsequence(query_lower, name_lower) {
        return Some(MatchTier::Fuzzy);
    }
    None
}

fn compare(a: &SearchHit, a_name: &str, b: &SearchHit, b_name: &str) -> Ordering {
    b.tier
        .cmp(&a.tier)
        .then_with(|| a_name.cmp(b_name))
        .then_with(|| a.record.path.cmp(&b.record.path))
}

/// Two-pointer scan: true when every character of `needle` appears in
/// `haystack` in order.
pub fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut wanted = needle.chars().peekable();
    for c in haystack.chars() {
        match wanted.peek() {
            Some(&w) if w == c => {
                wanted.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    wanted.peek().is_none()
}
