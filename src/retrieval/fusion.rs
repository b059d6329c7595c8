//! Late fusion: ranking objects through the documents associated with them.
//!
//! ```text
//! score(o) = Σ_{d → o} score(d)·w(d,o)
//! ```
//!
//! `w` is 1 for [`AssocMode::Binary`] and `1/n(o)` for
//! [`AssocMode::Uniform`], where `n(o)` is the number of fused documents
//! associated with `o`.

use std::collections::BTreeMap;

use ahash::AHashMap;
use log::debug;

use crate::config::AssocMode;
use crate::error::Result;
use crate::retrieval::trec::{RetrievalResults, ScoredDoc};

/// Document-centric object scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct LateFusion {
    assoc_mode: AssocMode,
}

impl LateFusion {
    pub fn new(assoc_mode: AssocMode) -> Self {
        LateFusion { assoc_mode }
    }

    pub fn assoc_mode(&self) -> AssocMode {
        self.assoc_mode
    }

    /// Score the objects `assoc` maps the documents to.
    pub fn fuse<F>(&self, docs: &[&ScoredDoc], mut assoc: F) -> Result<RetrievalResults>
    where
        F: FnMut(&str) -> Result<Vec<String>>,
    {
        let mut doc_objects = Vec::with_capacity(docs.len());
        let mut num_docs: AHashMap<String, usize> = AHashMap::new();
        for doc in docs {
            let mut objects = assoc(&doc.doc_id)?;
            objects.sort_unstable();
            objects.dedup();
            for object in &objects {
                *num_docs.entry(object.clone()).or_insert(0) += 1;
            }
            doc_objects.push((doc.score, objects));
        }

        let mut scores: BTreeMap<String, f64> = BTreeMap::new();
        for (score, objects) in doc_objects {
            for object in objects {
                let weight = match self.assoc_mode {
                    AssocMode::Binary => 1.0,
                    AssocMode::Uniform => {
                        1.0 / num_docs.get(&object).copied().unwrap_or(1) as f64
                    }
                };
                *scores.entry(object).or_insert(0.0) += score * weight;
            }
        }
        debug!("Fused {} documents into {} objects", docs.len(), scores.len());
        Ok(scores.into_iter().collect())
    }
}
