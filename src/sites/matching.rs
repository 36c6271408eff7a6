//! Deterministic company-name matching over site search results.

use super::SearchHit;
use strsim::jaro_winkler;

/// Minimum similarity for a search hit to be accepted.
pub const MATCH_THRESHOLD: f64 = 0.85;

/// Only this many hits, in site order, are considered.
pub const MAX_CANDIDATES: usize = 10;

const CORPORATE_SUFFIXES: &[&str] = &[
    "inc", "incorporated", "llc", "ltd", "limited", "corp", "corporation", "co", "company", "gmbh",
    "plc", "sa", "ag", "bv", "srl",
];

/// Lowercases, strips punctuation and trailing corporate suffixes.
pub fn normalize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect();

    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    while words.len() > 1 && words.last().is_some_and(|w| CORPORATE_SUFFIXES.contains(w)) {
        words.pop();
    }
    words.join(" ")
}

/// Name similarity in `[0, 1]`.
///
/// Equal normalized names score 1.0, a whole-word prefix in either direction
/// ("acme" vs "acme crm") scores 0.9, anything else is Jaro-Winkler.
pub fn similarity(query: &str, candidate: &str) -> f64 {
    let query = normalize_name(query);
    let candidate = normalize_name(candidate);

    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if query == candidate {
        return 1.0;
    }
    if is_word_prefix(&query, &candidate) || is_word_prefix(&candidate, &query) {
        return 0.9;
    }
    jaro_winkler(&query, &candidate)
}

fn is_word_prefix(prefix: &str, full: &str) -> bool {
    full.strip_prefix(prefix).is_some_and(|rest| rest.starts_with(' '))
}

/// Picks the first hit, in site order, that clears [`MATCH_THRESHOLD`].
pub fn best_match<'a>(company: &str, hits: &'a [SearchHit]) -> Option<&'a SearchHit> {
    hits.iter()
        .take(MAX_CANDIDATES)
        .find(|hit| similarity(company, &hit.name) >= MATCH_THRESHOLD)
}
