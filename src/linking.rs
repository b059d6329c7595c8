//! Entity linking in queries.
//!
//! The pipeline runs in stages, each usable on its own:
//!
//! 1. [`cmns::CandidateGenerator`] finds mentions (longest n-grams first)
//!    and their candidate entities with commonness scores,
//! 2. [`features::FeatureExtractor`] computes the ranking features of every
//!    (mention, entity, query) instance,
//! 3. [`crate::ml::Ranker`] scores the instances with a trained model,
//! 4. [`greedy::Greedy`] turns scored instances into non-overlapping
//!    interpretation sets.
//!
//! [`linker::EntityLinker`] wires the stages together according to a
//! [`crate::config::LinkingConfig`].

pub mod cmns;
pub mod features;
pub mod greedy;
pub mod linker;
pub mod ltr;
pub mod mention;

use std::collections::BTreeMap;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use cmns::{CandidateGenerator, Cmns};
pub use features::{FeatureCache, FeatureExtractor};
pub use greedy::Greedy;
pub use linker::{EntityLinker, LinkingOutput};
pub use ltr::Ltr;
pub use mention::Mention;

/// Candidate entities per mention: `{mention: {entity_id: score}}`.
pub type CandidateMap = BTreeMap<String, BTreeMap<String, f64>>;

/// One reading of a query: `{mention: (entity_id, score)}`, no two mentions
/// sharing a word.
pub type Interpretation = BTreeMap<String, (String, f64)>;

/// A mention linked to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedEntity {
    pub mention: String,
    pub entity: String,
    pub score: f64,
}

impl LinkedEntity {
    pub fn new<M: Into<String>, E: Into<String>>(mention: M, entity: E, score: f64) -> Self {
        LinkedEntity {
            mention: mention.into(),
            entity: entity.into(),
            score,
        }
    }
}

/// Order by descending score, then mention and entity.
pub(crate) fn sort_linked(linked: &mut [LinkedEntity]) {
    linked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.mention.cmp(&b.mention))
            .then_with(|| a.entity.cmp(&b.entity))
    });
}

/// ELQ evaluation lines `qid\t1\tentity`, queries in sorted order.
pub fn to_elq_eval(annotations: &BTreeMap<String, Vec<LinkedEntity>>) -> String {
    let mut out = String::new();
    for (qid, linked) in annotations {
        for annot in linked {
            out.push_str(&format!("{qid}\t1\t{}\n", annot.entity));
        }
    }
    out
}

pub fn write_elq_eval<P: AsRef<Path>>(
    annotations: &BTreeMap<String, Vec<LinkedEntity>>,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, to_elq_eval(annotations))?;
    info!("ELQ evaluation file: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_linked() {
        let mut linked = vec![
            LinkedEntity::new("obama", "<dbpedia:B>", 0.5),
            LinkedEntity::new("honolulu", "<dbpedia:H>", 0.9),
            LinkedEntity::new("barack", "<dbpedia:B>", 0.5),
        ];
        sort_linked(&mut linked);
        let mentions: Vec<&str> = linked.iter().map(|l| l.mention.as_str()).collect();
        assert_eq!(mentions, vec!["honolulu", "barack", "obama"]);
    }

    #[test]
    fn test_elq_format() {
        let mut annotations = BTreeMap::new();
        annotations.insert(
            "q2".to_string(),
            vec![LinkedEntity::new("honolulu", "<dbpedia:Honolulu>", 0.8)],
        );
        annotations.insert("q1".to_string(), vec![]);
        assert_eq!(to_elq_eval(&annotations), "q2\t1\t<dbpedia:Honolulu>\n");
    }

    #[test]
    fn test_linked_entity_json() {
        let linked = LinkedEntity::new("honolulu", "<dbpedia:Honolulu>", 0.5);
        let json = serde_json::to_value(&linked).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"mention": "honolulu", "entity": "<dbpedia:Honolulu>", "score": 0.5})
        );
    }
}
