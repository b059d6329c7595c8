//! Single-field language model scorer.

use crate::error::Result;
use crate::scoring::smoothing::Smoothing;
use crate::scoring::{DocumentScorer, TermProbs, distinct_terms, log_likelihood};
use crate::stats::StatsCache;

/// Smoothed probabilities of the distinct query terms in one document field.
pub fn field_term_probs(
    smoothing: &Smoothing,
    cache: &mut StatsCache<'_>,
    doc_id: &str,
    field: &str,
    query_terms: &[String],
) -> Result<TermProbs> {
    let mut probs = TermProbs::new();
    for term in distinct_terms(query_terms) {
        let p = smoothing.term_prob(cache, doc_id, field, term)?;
        probs.insert(term.to_string(), p);
    }
    Ok(probs)
}

/// Query likelihood scorer over a single field.
#[derive(Debug, Clone)]
pub struct ScorerLm {
    field: String,
    smoothing: Smoothing,
    query_terms: Vec<String>,
}

impl ScorerLm {
    pub fn new<S: Into<String>>(field: S, smoothing: Smoothing, query_terms: Vec<String>) -> Self {
        ScorerLm {
            field: field.into(),
            smoothing,
            query_terms,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn query_terms(&self) -> &[String] {
        &self.query_terms
    }

    /// `p(t|θd,f)` for every distinct query term.
    pub fn term_probs(&self, cache: &mut StatsCache<'_>, doc_id: &str) -> Result<TermProbs> {
        field_term_probs(&self.smoothing, cache, doc_id, &self.field, &self.query_terms)
    }
}

impl DocumentScorer for ScorerLm {
    fn score(&mut self, cache: &mut StatsCache<'_>, doc_id: &str) -> Result<Option<f64>> {
        let probs = self.term_probs(cache, doc_id)?;
        Ok(log_likelihood(&self.query_terms, &probs))
    }

    fn name(&self) -> &str {
        "lm"
    }

    fn fields(&self) -> Vec<String> {
        vec![self.field.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::smoothing::SmoothingParam;
    use crate::stats::MemoryIndex;

    fn create_test_index() -> MemoryIndex {
        let mut index = MemoryIndex::new();
        index.add_document("1", [("title", "gonna friends"), ("content", "friends forever")]);
        index.add_document("2", [("title", "best friends"), ("content", "gonna gonna party")]);
        index.add_document("3", [("title", "party"), ("content", "music")]);
        index
    }

    fn terms(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_jm_score() {
        let index = create_test_index();
        let mut cache = StatsCache::new(&index);
        let smoothing = Smoothing::JelinekMercer { lambda: 0.1 };
        let mut scorer = ScorerLm::new("content", smoothing, terms(&["gonna", "friends"]));

        // content: |C| = 6, tf(gonna,C) = 2, tf(friends,C) = 1; |d2| = 3
        let p_gonna: f64 = 0.9 * 2.0 / 3.0 + 0.1 * 2.0 / 6.0;
        let p_friends: f64 = 0.1 * 1.0 / 6.0;
        let expected = p_gonna.ln() + p_friends.ln();
        let score = scorer.score(&mut cache, "2").unwrap().unwrap();
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_dirichlet_score() {
        let index = create_test_index();
        let mut cache = StatsCache::new(&index);
        let smoothing = Smoothing::Dirichlet {
            mu: SmoothingParam::Value(2000.0),
        };
        let mut scorer = ScorerLm::new("content", smoothing, terms(&["gonna"]));

        let expected: f64 = ((2.0 + 2000.0 * 2.0 / 6.0) / (3.0 + 2000.0f64)).ln();
        let score = scorer.score(&mut cache, "2").unwrap().unwrap();
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_unseen_terms_are_skipped() {
        let index = create_test_index();
        let mut cache = StatsCache::new(&index);
        let smoothing = Smoothing::JelinekMercer { lambda: 0.1 };

        let mut with_unseen =
            ScorerLm::new("content", smoothing, terms(&["music", "zzz"]));
        let mut without = ScorerLm::new("content", smoothing, terms(&["music"]));
        let a = with_unseen.score(&mut cache, "3").unwrap().unwrap();
        let b = without.score(&mut cache, "3").unwrap().unwrap();
        assert_eq!(a, b);

        let mut only_unseen = ScorerLm::new("content", smoothing, terms(&["zzz"]));
        assert_eq!(only_unseen.score(&mut cache, "3").unwrap(), None);
    }

    #[test]
    fn test_repeated_query_terms() {
        let index = create_test_index();
        let mut cache = StatsCache::new(&index);
        let smoothing = Smoothing::JelinekMercer { lambda: 0.5 };
        let mut once = ScorerLm::new("title", smoothing, terms(&["party"]));
        let mut twice = ScorerLm::new("title", smoothing, terms(&["party", "party"]));
        let a = once.score(&mut cache, "3").unwrap().unwrap();
        let b = twice.score(&mut cache, "3").unwrap().unwrap();
        assert!((b - 2.0 * a).abs() < 1e-12);
    }
}
