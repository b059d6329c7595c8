//! PRMS field-mapping probabilities.
//!
//! For a term `t` and a set of candidate fields:
//!
//! ```text
//! p(f|t) = P(t|f)·P(f) / Σ_f' P(t|f')·P(f')
//! P(t|f) = ctf(t,f) / |C_f|
//! P(f)   = docCount(f) / Σ_f' docCount(f')
//! ```
//!
//! Fields with a zero numerator are left out of the mapping, and a term
//! unseen in every field maps to an empty mapping ("no field preference").

use std::collections::BTreeMap;

use log::debug;

use crate::error::Result;
use crate::stats::StatsCache;

/// Collection statistics of one term in one field.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldTermStats {
    /// `ctf(t,f)`
    pub coll_term_freq: u64,
    /// `|C_f|`
    pub coll_length: u64,
    /// `docCount(f)`
    pub doc_count: u64,
}

/// Compute `p(f|t)` from per-field statistics of a term.
pub fn mapping_probs(
    stats: &BTreeMap<String, FieldTermStats>,
    total_field_freq: u64,
) -> BTreeMap<String, f64> {
    let mut numerators = BTreeMap::new();
    for (field, s) in stats {
        let p_t_f = if s.coll_length > 0 {
            s.coll_term_freq as f64 / s.coll_length as f64
        } else {
            0.0
        };
        let p_f = if total_field_freq > 0 {
            s.doc_count as f64 / total_field_freq as f64
        } else {
            0.0
        };
        let numerator = p_t_f * p_f;
        if numerator > 0.0 {
            numerators.insert(field.clone(), numerator);
        }
    }

    let denominator: f64 = numerators.values().sum();
    if denominator > 0.0 {
        for value in numerators.values_mut() {
            *value /= denominator;
        }
    }
    numerators
}

/// Field-mapping estimator over a fixed set of fields.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    fields: Vec<String>,
    total_field_freq: Option<u64>,
}

impl FieldMapping {
    pub fn new(fields: Vec<String>) -> Self {
        FieldMapping {
            fields,
            total_field_freq: None,
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// `Σ_f docCount(f)`, computed once.
    pub fn total_field_freq(&mut self, cache: &mut StatsCache<'_>) -> Result<u64> {
        if let Some(total) = self.total_field_freq {
            return Ok(total);
        }
        let mut total = 0;
        for field in &self.fields {
            total += cache.doc_count(field)?;
        }
        self.total_field_freq = Some(total);
        Ok(total)
    }

    /// `p(f|t)` for every field where the term occurs.
    pub fn mapping_prob(
        &mut self,
        cache: &mut StatsCache<'_>,
        term: &str,
    ) -> Result<BTreeMap<String, f64>> {
        let total = self.total_field_freq(cache)?;
        let mut stats = BTreeMap::new();
        for field in &self.fields {
            stats.insert(
                field.clone(),
                FieldTermStats {
                    coll_term_freq: cache.coll_term_freq(term, field)?,
                    coll_length: cache.coll_length(field)?,
                    doc_count: cache.doc_count(field)?,
                },
            );
        }
        let probs = mapping_probs(&stats, total);
        debug!("p(f|{}) = {:?}", term, probs);
        Ok(probs)
    }
}
