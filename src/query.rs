//! Query representation used by entity linking.
//!
//! A [`Query`] keeps the raw query string and a normalized form: characters
//! outside `[A-Za-z0-9+-]` are folded to spaces, the boolean connectors
//! ` OR ` / ` AND ` are stripped, whitespace is collapsed and the result is
//! lower-cased. Terms and n-grams are derived from the normalized form.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static NON_QUERY_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9+\-]+").expect("valid regex"));

/// An immutable, normalized query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    qid: String,
    raw: String,
    normalized: String,
}

impl Query {
    /// Create a query without an identifier.
    pub fn new(raw: &str) -> Self {
        Self::with_id(raw, "")
    }

    /// Create a query with the given identifier.
    pub fn with_id(raw: &str, qid: &str) -> Self {
        Query {
            qid: qid.to_string(),
            raw: raw.to_string(),
            normalized: normalize(raw),
        }
    }

    pub fn qid(&self) -> &str {
        &self.qid
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The normalized (processed) query string.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Whitespace-delimited terms of the normalized query.
    pub fn terms(&self) -> Vec<&str> {
        self.normalized.split_whitespace().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    /// All contiguous n-grams, shortest first and in query order within a
    /// length. A query of `L` terms yields `L(L+1)/2` n-grams.
    pub fn ngrams(&self) -> Vec<String> {
        let terms = self.terms();
        let mut ngrams = Vec::with_capacity(terms.len() * (terms.len() + 1) / 2);
        for len in 1..=terms.len() {
            for window in terms.windows(len) {
                ngrams.push(window.join(" "));
            }
        }
        ngrams
    }

    /// N-grams grouped by their number of words.
    pub fn ngrams_by_length(&self) -> BTreeMap<usize, Vec<String>> {
        let mut grouped: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for ngram in self.ngrams() {
            grouped
                .entry(ngram.split_whitespace().count())
                .or_default()
                .push(ngram);
        }
        grouped
    }
}

/// Normalize a raw query string.
pub fn normalize(raw: &str) -> String {
    let folded = NON_QUERY_CHARS.replace_all(raw, " ");
    let stripped = folded.replace(" OR ", " ").replace(" AND ", " ");
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let query = Query::with_id("Barack Obama's  birthplace, Honolulu?", "q1");
        assert_eq!(query.qid(), "q1");
        assert_eq!(query.raw(), "Barack Obama's  birthplace, Honolulu?");
        assert_eq!(query.normalized(), "barack obama s birthplace honolulu");
    }

    #[test]
    fn test_boolean_connectors_stripped() {
        let query = Query::new("cats OR dogs AND birds");
        assert_eq!(query.normalized(), "cats dogs birds");
        // lower-case connectors are ordinary words
        assert_eq!(Query::new("salt and pepper").normalized(), "salt and pepper");
    }

    #[test]
    fn test_keeps_plus_and_minus() {
        assert_eq!(Query::new("C++ x-men").normalized(), "c++ x-men");
    }

    #[test]
    fn test_ngrams_are_exhaustive() {
        let query = Query::new("barack obama born honolulu");
        let ngrams = query.ngrams();
        assert_eq!(ngrams.len(), 4 * 5 / 2);
        assert_eq!(ngrams[0], "barack");
        assert_eq!(ngrams.last().unwrap(), "barack obama born honolulu");

        let grouped = query.ngrams_by_length();
        assert_eq!(grouped[&2], vec!["barack obama", "obama born", "born honolulu"]);
        assert_eq!(grouped[&4].len(), 1);
    }

    #[test]
    fn test_empty_query() {
        let query = Query::new("?!");
        assert!(query.is_empty());
        assert!(query.terms().is_empty());
        assert!(query.ngrams().is_empty());
    }
}
