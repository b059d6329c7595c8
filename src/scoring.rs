//! Field-aware language-model scoring.
//!
//! Three retrieval models score a document against an analyzed query:
//!
//! - [`ScorerLm`]: smoothed query likelihood on a single field,
//! - [`ScorerMlm`]: a fixed-weight mixture of field language models,
//! - [`ScorerPrms`]: field language models re-weighted per term by the PRMS
//!   field-mapping probability `p(f|t)`.
//!
//! [`ScorerElr`] wraps any of them and adds the evidence of entities
//! annotated in the query.
//!
//! Scores are natural-log likelihoods. A document is left unscored
//! (`Ok(None)`) when none of the distinct query terms has a non-zero
//! probability; callers must exclude such documents from the ranking rather
//! than treat them as a score of zero.
//!
//! # Examples
//!
//! ```
//! use lexlink::config::ScorerConfig;
//! use lexlink::scoring::{DocumentScorer, Scorer};
//! use lexlink::stats::{MemoryIndex, StatsCache};
//!
//! let mut index = MemoryIndex::new();
//! index.add_document("d1", [("title", "Barack Obama"), ("body", "born in Honolulu")]);
//! index.add_document("d2", [("title", "Honolulu"), ("body", "capital of Hawaii")]);
//!
//! let config = ScorerConfig::lm("body");
//! let mut scorer = Scorer::from_config(&config, vec!["honolulu".to_string()]).unwrap();
//! let mut cache = StatsCache::new(&index);
//!
//! let s1 = scorer.score(&mut cache, "d1").unwrap().unwrap();
//! let s2 = scorer.score(&mut cache, "d2").unwrap().unwrap();
//! assert!(s1 > s2);
//! ```

pub mod elr;
pub mod field_mapping;
pub mod lm;
pub mod mlm;
pub mod prms;
pub mod smoothing;

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::config::{FieldSpec, ScorerConfig};
use crate::error::Result;
use crate::stats::StatsCache;

pub use elr::ScorerElr;
pub use field_mapping::FieldMapping;
pub use lm::ScorerLm;
pub use mlm::ScorerMlm;
pub use prms::ScorerPrms;
pub use smoothing::{Smoothing, SmoothingParam};

/// Term probabilities of the distinct query terms: `{term: p(t|θd)}`.
pub type TermProbs = BTreeMap<String, f64>;

/// A retrieval model scoring one document at a time.
pub trait DocumentScorer: Send + std::fmt::Debug {
    /// Score a document; `Ok(None)` when no query term occurs in the scored
    /// fields across the collection.
    fn score(&mut self, cache: &mut StatsCache<'_>, doc_id: &str) -> Result<Option<f64>>;

    /// Name of the retrieval model.
    fn name(&self) -> &str;

    /// Fields read while scoring.
    fn fields(&self) -> Vec<String>;
}

/// Scorer selected by model name.
#[derive(Debug, Clone)]
pub enum Scorer {
    Lm(ScorerLm),
    Mlm(ScorerMlm),
    Prms(ScorerPrms),
}

impl Scorer {
    /// Build a scorer for the analyzed query terms from a validated
    /// configuration.
    pub fn from_config(config: &ScorerConfig, query_terms: Vec<String>) -> Result<Self> {
        let smoothing = config.smoothing()?;
        let scorer = match config.field_spec()? {
            FieldSpec::Single(field) => Scorer::Lm(ScorerLm::new(field, smoothing, query_terms)),
            FieldSpec::Weighted(weights) => {
                Scorer::Mlm(ScorerMlm::new(weights, smoothing, query_terms))
            }
            FieldSpec::List(fields) => Scorer::Prms(ScorerPrms::new(fields, smoothing, query_terms)),
        };
        debug!("{} scoring ({:?})", scorer.name(), smoothing);
        Ok(scorer)
    }
}

impl DocumentScorer for Scorer {
    fn score(&mut self, cache: &mut StatsCache<'_>, doc_id: &str) -> Result<Option<f64>> {
        match self {
            Scorer::Lm(s) => s.score(cache, doc_id),
            Scorer::Mlm(s) => s.score(cache, doc_id),
            Scorer::Prms(s) => s.score(cache, doc_id),
        }
    }

    fn name(&self) -> &str {
        match self {
            Scorer::Lm(s) => s.name(),
            Scorer::Mlm(s) => s.name(),
            Scorer::Prms(s) => s.name(),
        }
    }

    fn fields(&self) -> Vec<String> {
        match self {
            Scorer::Lm(s) => s.fields(),
            Scorer::Mlm(s) => s.fields(),
            Scorer::Prms(s) => s.fields(),
        }
    }
}

/// Distinct query terms in a stable order.
pub(crate) fn distinct_terms(query_terms: &[String]) -> BTreeSet<&str> {
    query_terms.iter().map(String::as_str).collect()
}

/// Query log-likelihood `Σ_t log p(t|θd)` over the query terms, duplicates
/// included. Terms with zero probability are skipped; `None` when every
/// distinct term has zero probability.
pub(crate) fn log_likelihood(query_terms: &[String], probs: &TermProbs) -> Option<f64> {
    if probs.values().sum::<f64>() == 0.0 {
        return None;
    }
    let score = query_terms
        .iter()
        .filter_map(|t| probs.get(t).copied())
        .filter(|&p| p > 0.0)
        .map(f64::ln)
        .sum();
    Some(score)
}
