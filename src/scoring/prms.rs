//! Probabilistic Retrieval Model for Semistructured data (PRMS).
//!
//! `p(t|θd) = Σ_f p(f|t) · p(t|θd,f)`, with `p(f|t)` from the
//! [`FieldMapping`] estimator computed once per query term.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::scoring::field_mapping::FieldMapping;
use crate::scoring::lm::field_term_probs;
use crate::scoring::smoothing::Smoothing;
use crate::scoring::{DocumentScorer, TermProbs, distinct_terms};
use crate::stats::StatsCache;

#[derive(Debug, Clone)]
pub struct ScorerPrms {
    mapping: FieldMapping,
    smoothing: Smoothing,
    query_terms: Vec<String>,
    mapping_probs: Option<BTreeMap<String, BTreeMap<String, f64>>>,
}

impl ScorerPrms {
    pub fn new(fields: Vec<String>, smoothing: Smoothing, query_terms: Vec<String>) -> Self {
        ScorerPrms {
            mapping: FieldMapping::new(fields),
            smoothing,
            query_terms,
            mapping_probs: None,
        }
    }

    /// `p(f|t)` of every distinct query term, computed on first use.
    pub fn mapping_probs(
        &mut self,
        cache: &mut StatsCache<'_>,
    ) -> Result<&BTreeMap<String, BTreeMap<String, f64>>> {
        if self.mapping_probs.is_none() {
            let mut probs = BTreeMap::new();
            for term in distinct_terms(&self.query_terms) {
                probs.insert(term.to_string(), self.mapping.mapping_prob(cache, term)?);
            }
            self.mapping_probs = Some(probs);
        }
        Ok(self.mapping_probs.get_or_insert_with(BTreeMap::new))
    }
}

impl DocumentScorer for ScorerPrms {
    fn score(&mut self, cache: &mut StatsCache<'_>, doc_id: &str) -> Result<Option<f64>> {
        let p_f_t = self.mapping_probs(cache)?.clone();

        let mut p_t_theta_d_f: BTreeMap<String, TermProbs> = BTreeMap::new();
        for field in self.mapping.fields() {
            let probs = field_term_probs(&self.smoothing, cache, doc_id, field, &self.query_terms)?;
            p_t_theta_d_f.insert(field.clone(), probs);
        }
        let total: f64 = p_t_theta_d_f.values().flat_map(|p| p.values()).sum();
        if total == 0.0 {
            return Ok(None);
        }

        let mut score = 0.0;
        for term in &self.query_terms {
            let mut p_t_theta_d = 0.0;
            if let Some(field_probs) = p_f_t.get(term) {
                for (field, p_f) in field_probs {
                    let p = p_t_theta_d_f
                        .get(field)
                        .and_then(|probs| probs.get(term))
                        .copied()
                        .unwrap_or(0.0);
                    p_t_theta_d += p_f * p;
                }
            }
            if p_t_theta_d > 0.0 {
                score += p_t_theta_d.ln();
            }
        }
        Ok(Some(score))
    }

    fn name(&self) -> &str {
        "prms"
    }

    fn fields(&self) -> Vec<String> {
        self.mapping.fields().to_vec()
    }
}
