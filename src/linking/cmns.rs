//! Mention detection and the commonness baseline linker.

use log::debug;

use crate::catalog::{EntityCatalog, KbSnapshot};
use crate::error::Result;
use crate::linking::mention::Mention;
use crate::linking::{CandidateMap, LinkedEntity, sort_linked};
use crate::query::Query;

/// Finds mentions in a query together with their candidate entities.
#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    catalog: EntityCatalog,
    sources: Vec<String>,
    cmns_threshold: Option<f64>,
}

impl CandidateGenerator {
    pub fn new(catalog: EntityCatalog, sources: Vec<String>, cmns_threshold: Option<f64>) -> Self {
        CandidateGenerator {
            catalog,
            sources,
            cmns_threshold,
        }
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Mentions and their candidates, `{mention: {entity_id: score}}`.
    ///
    /// N-grams are visited from the longest down to single words, in query
    /// order within a length. An n-gram becomes a mention when it has at
    /// least one candidate and neither lies inside nor contains an already
    /// accepted mention.
    pub fn generate(&self, query: &Query) -> Result<CandidateMap> {
        let ngrams = query.ngrams_by_length();
        let mut accepted: Vec<String> = Vec::new();
        let mut candidates = CandidateMap::new();

        for ngrams in ngrams.values().rev() {
            for ngram in ngrams {
                if overlaps_accepted(ngram, &accepted) {
                    continue;
                }
                let cands = Mention::new(ngram).candidates(
                    &self.catalog,
                    &self.sources,
                    self.cmns_threshold,
                )?;
                if cands.is_empty() {
                    continue;
                }
                debug!("Mention \"{ngram}\": {} candidates", cands.len());
                accepted.push(ngram.clone());
                candidates.insert(ngram.clone(), cands);
            }
        }
        Ok(candidates)
    }
}

fn overlaps_accepted(ngram: &str, accepted: &[String]) -> bool {
    accepted
        .iter()
        .any(|m| m.contains(ngram) || ngram.contains(m.as_str()))
}

/// Links every mention to its most common entity.
#[derive(Debug, Clone)]
pub struct Cmns {
    generator: CandidateGenerator,
    threshold: f64,
    snapshot: KbSnapshot,
}

impl Cmns {
    pub fn new(generator: CandidateGenerator, threshold: f64, snapshot: KbSnapshot) -> Self {
        Cmns {
            generator,
            threshold,
            snapshot,
        }
    }

    pub fn rank_ens(&self, query: &Query) -> Result<CandidateMap> {
        self.generator.generate(query)
    }

    pub fn link(&self, query: &Query) -> Result<Vec<LinkedEntity>> {
        let ranked = self.rank_ens(query)?;
        Ok(self.disambiguate(&ranked))
    }

    /// Top entity per mention; ties go to the smaller entity id.
    pub fn disambiguate(&self, ranked: &CandidateMap) -> Vec<LinkedEntity> {
        let mut linked: Vec<LinkedEntity> = ranked
            .iter()
            .filter_map(|(mention, entities)| {
                entities
                    .iter()
                    .max_by(|(ea, sa), (eb, sb)| sa.total_cmp(sb).then_with(|| eb.cmp(ea)))
                    .map(|(entity, score)| LinkedEntity::new(mention, entity, *score))
            })
            .filter(|l| l.score >= self.threshold && self.snapshot.is_name_entity(&l.entity))
            .collect();
        sort_linked(&mut linked);
        linked
    }
}
