//! Entity-linking-based retrieval (ELR).
//!
//! A term-based score is interpolated with the evidence of the entities
//! annotated in the query:
//!
//! ```text
//! score(d) = λ_T·score_T(d) + λ_E·Σ_e ŝ(e)·log p(e|d)
//! p(e|d)   = Σ_f p(e|d_f)·p(f|e)
//! p(e|d_f) = (1-λ)·1[tf(e,d_f) > 0] + λ·df(f,e)/df(f)
//! ```
//!
//! `ŝ` are the annotation scores normalized to sum to 1 and `p(f|e)` is the
//! PRMS mapping probability of the entity URI. Entity statistics come from a
//! separate index whose field terms are entity URIs (see
//! [`crate::analysis::Analyzer::uri`]).

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use serde::Deserialize;

use crate::config::ElrConfig;
use crate::error::Result;
use crate::scoring::{DocumentScorer, FieldMapping, Scorer};
use crate::stats::StatsCache;

/// Smoothing weight λ of `p(e|d_f)`.
pub const URI_LAMBDA: f64 = 0.1;

/// Fields never returned by [`top_fields`].
pub const FSDM_FIELDS: [&str; 5] = [
    "names",
    "categories",
    "attributes",
    "similar_entity_names",
    "related_entity_names",
];

/// Entity annotations of one query: `{entity: score}`.
pub type EntityAnnotations = BTreeMap<String, f64>;

/// Precomputed field mappings: `{entity: {field: p(f|e)}}`.
pub type EntityFieldMappings = BTreeMap<String, BTreeMap<String, f64>>;

/// Scale annotation scores to sum to 1; empty when they sum to 0.
pub fn normalize_annotations(annotations: &EntityAnnotations) -> EntityAnnotations {
    let total: f64 = annotations.values().sum();
    if total <= 0.0 {
        return EntityAnnotations::new();
    }
    annotations
        .iter()
        .map(|(entity, score)| (entity.clone(), score / total))
        .collect()
}

#[derive(Debug, Deserialize)]
struct Annotation {
    entity: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct AnnotatedQuery {
    #[serde(default, alias = "annots")]
    results: Vec<Annotation>,
}

/// Load query annotations `{qid: {"results": [{entity, score}, ...]}}`,
/// keeping those scored at least `threshold`.
pub fn load_annotations<P: AsRef<Path>>(
    path: P,
    threshold: f64,
) -> Result<BTreeMap<String, EntityAnnotations>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let queries: BTreeMap<String, AnnotatedQuery> = serde_json::from_str(&content)?;
    let annotations: BTreeMap<String, EntityAnnotations> = queries
        .into_iter()
        .map(|(qid, query)| {
            let entities = query
                .results
                .into_iter()
                .filter(|a| a.score >= threshold)
                .map(|a| (a.entity, a.score))
                .collect();
            (qid, entities)
        })
        .collect();
    info!(
        "Loaded annotations of {} queries from {}",
        annotations.len(),
        path.display()
    );
    Ok(annotations)
}

/// Load precomputed field mappings `{entity: {field: p}}`.
pub fn load_field_mappings<P: AsRef<Path>>(path: P) -> Result<EntityFieldMappings> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// `p(e|d_f)`; 0 when no document has the field.
pub fn uri_prob(
    cache: &mut StatsCache<'_>,
    doc_id: &str,
    field: &str,
    entity: &str,
    lambda: f64,
) -> Result<f64> {
    let df_f = cache.doc_count(field)?;
    if df_f == 0 {
        return Ok(0.0);
    }
    let tf = if cache.term_freq(doc_id, field, entity)? > 0 { 1.0 } else { 0.0 };
    let df_f_e = cache.doc_freq(entity, field)?;
    Ok((1.0 - lambda) * tf + lambda * df_f_e as f64 / df_f as f64)
}

/// The `n` fields with the highest document frequency of the entity, ties
/// broken by field name (descending).
pub fn top_fields(
    cache: &mut StatsCache<'_>,
    entity: &str,
    fields: &[String],
    n: usize,
) -> Result<Vec<String>> {
    let mut doc_freqs = Vec::new();
    for field in fields {
        let df = cache.doc_freq(entity, field)?;
        if df > 0 {
            doc_freqs.push((df, field.as_str()));
        }
    }
    doc_freqs.sort_unstable_by(|a, b| b.cmp(a));
    Ok(doc_freqs
        .into_iter()
        .filter(|(_, field)| !FSDM_FIELDS.contains(field))
        .take(n)
        .map(|(_, field)| field.to_string())
        .collect())
}

/// PRMS mapping of entity URIs over their top fields.
#[derive(Debug, Clone)]
pub struct ElrFieldMapper {
    fields: Vec<String>,
    n_fields: usize,
}

impl ElrFieldMapper {
    pub fn new(fields: Vec<String>, n_fields: usize) -> Self {
        ElrFieldMapper { fields, n_fields }
    }

    /// `p(f|e)` over the entity's top fields.
    pub fn map(&self, cache: &mut StatsCache<'_>, entity: &str) -> Result<BTreeMap<String, f64>> {
        let top = top_fields(cache, entity, &self.fields, self.n_fields)?;
        debug!("Top fields of {entity}: {top:?}");
        FieldMapping::new(top).mapping_prob(cache, entity)
    }
}

/// Term-based scorer extended with query entity annotations.
#[derive(Debug)]
pub struct ScorerElr<'a> {
    term_scorer: Scorer,
    uri_stats: StatsCache<'a>,
    entities: EntityAnnotations,
    lambda_t: f64,
    lambda_e: f64,
    uri_mapping: FieldMapping,
    precomputed: Arc<EntityFieldMappings>,
    field_weights: BTreeMap<String, BTreeMap<String, f64>>,
}

impl<'a> ScorerElr<'a> {
    pub fn new(
        term_scorer: Scorer,
        uri_stats: StatsCache<'a>,
        annotations: &EntityAnnotations,
        config: &ElrConfig,
    ) -> Self {
        ScorerElr {
            term_scorer,
            uri_stats,
            entities: normalize_annotations(annotations),
            lambda_t: config.lambda_t(),
            lambda_e: config.lambda_e(),
            uri_mapping: FieldMapping::new(config.uri_fields.clone()),
            precomputed: Arc::new(EntityFieldMappings::new()),
            field_weights: BTreeMap::new(),
        }
    }

    /// Use precomputed `p(f|e)` for the entities they cover.
    pub fn with_field_mappings(mut self, mappings: Arc<EntityFieldMappings>) -> Self {
        self.precomputed = mappings;
        self
    }

    /// Normalized annotation scores.
    pub fn entities(&self) -> &EntityAnnotations {
        &self.entities
    }

    /// Fetch the URI-field term vectors of the documents to be scored.
    pub fn prefetch(&mut self, doc_ids: &[String]) -> Result<()> {
        for field in self.uri_mapping.fields() {
            self.uri_stats.prefetch_term_vectors(doc_ids, field)?;
        }
        Ok(())
    }

    /// `p(f|e)` restricted to the URI fields.
    fn field_weights(&mut self, entity: &str) -> Result<BTreeMap<String, f64>> {
        if let Some(weights) = self.field_weights.get(entity) {
            return Ok(weights.clone());
        }
        let weights = match self.precomputed.get(entity) {
            Some(mapping) => self
                .uri_mapping
                .fields()
                .iter()
                .map(|f| (f.clone(), mapping.get(f).copied().unwrap_or(0.0)))
                .collect(),
            None => self.uri_mapping.mapping_prob(&mut self.uri_stats, entity)?,
        };
        self.field_weights.insert(entity.to_string(), weights.clone());
        Ok(weights)
    }

    /// `p(e|d)`
    pub fn entity_prob(&mut self, entity: &str, doc_id: &str) -> Result<f64> {
        let mut p = 0.0;
        for (field, p_f_e) in self.field_weights(entity)? {
            p += uri_prob(&mut self.uri_stats, doc_id, &field, entity, URI_LAMBDA)? * p_f_e;
        }
        Ok(p)
    }

    /// `p(E|d)`, skipping entities with `p(e|d) = 0`.
    pub fn entity_score(&mut self, doc_id: &str) -> Result<f64> {
        if self.lambda_e == 0.0 {
            return Ok(0.0);
        }
        let entities: Vec<(String, f64)> =
            self.entities.iter().map(|(e, s)| (e.clone(), *s)).collect();
        let mut score = 0.0;
        for (entity, weight) in entities {
            let p_e_d = self.entity_prob(&entity, doc_id)?;
            if p_e_d != 0.0 {
                score += weight * p_e_d.ln();
            }
        }
        Ok(score)
    }
}

impl DocumentScorer for ScorerElr<'_> {
    fn score(&mut self, cache: &mut StatsCache<'_>, doc_id: &str) -> Result<Option<f64>> {
        let Some(term_score) = self.term_scorer.score(cache, doc_id)? else {
            return Ok(None);
        };
        let entity_score = self.entity_score(doc_id)?;
        Ok(Some(self.lambda_t * term_score + self.lambda_e * entity_score))
    }

    fn name(&self) -> &str {
        "elr"
    }

    fn fields(&self) -> Vec<String> {
        self.term_scorer.fields()
    }
}
