//! Mixture of language models (Ogilvie & Callan, SIGIR 2003).
//!
//! `p(t|θd) = Σ_f w_f · p(t|θd,f)` with caller-supplied field weights.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::scoring::lm::field_term_probs;
use crate::scoring::smoothing::Smoothing;
use crate::scoring::{DocumentScorer, TermProbs, distinct_terms, log_likelihood};
use crate::stats::StatsCache;

/// Fixed-weight multi-field scorer.
#[derive(Debug, Clone)]
pub struct ScorerMlm {
    field_weights: BTreeMap<String, f64>,
    smoothing: Smoothing,
    query_terms: Vec<String>,
}

impl ScorerMlm {
    pub fn new(
        field_weights: BTreeMap<String, f64>,
        smoothing: Smoothing,
        query_terms: Vec<String>,
    ) -> Self {
        ScorerMlm {
            field_weights,
            smoothing,
            query_terms,
        }
    }

    pub fn field_weights(&self) -> &BTreeMap<String, f64> {
        &self.field_weights
    }

    pub fn query_terms(&self) -> &[String] {
        &self.query_terms
    }

    /// Mixture probability of every distinct query term.
    pub fn term_probs(&self, cache: &mut StatsCache<'_>, doc_id: &str) -> Result<TermProbs> {
        let mut probs: TermProbs = distinct_terms(&self.query_terms)
            .into_iter()
            .map(|t| (t.to_string(), 0.0))
            .collect();
        for (field, weight) in &self.field_weights {
            let field_probs =
                field_term_probs(&self.smoothing, cache, doc_id, field, &self.query_terms)?;
            for (term, p) in field_probs {
                if let Some(total) = probs.get_mut(&term) {
                    *total += weight * p;
                }
            }
        }
        Ok(probs)
    }
}

impl DocumentScorer for ScorerMlm {
    fn score(&mut self, cache: &mut StatsCache<'_>, doc_id: &str) -> Result<Option<f64>> {
        let probs = self.term_probs(cache, doc_id)?;
        Ok(log_likelihood(&self.query_terms, &probs))
    }

    fn name(&self) -> &str {
        "mlm"
    }

    fn fields(&self) -> Vec<String> {
        self.field_weights.keys().cloned().collect()
    }
}
