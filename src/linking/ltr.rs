//! Learning-to-rank entity linker.

use log::debug;

use crate::catalog::KbSnapshot;
use crate::error::Result;
use crate::linking::cmns::CandidateGenerator;
use crate::linking::features::FeatureExtractor;
use crate::linking::greedy::{self, Greedy, PROP_ENTITY, PROP_MENTION};
use crate::linking::{Interpretation, LinkedEntity};
use crate::ml::{Instance, Instances, Ranker};
use crate::query::Query;

pub const PROP_QID: &str = "qid";
pub const PROP_QUERY: &str = "query";

/// Ranks every (mention, entity) candidate with a trained model and keeps a
/// non-overlapping selection.
#[derive(Debug)]
pub struct Ltr<'a> {
    generator: CandidateGenerator,
    extractor: FeatureExtractor<'a>,
    ranker: Ranker,
    greedy: Greedy,
    snapshot: KbSnapshot,
}

impl<'a> Ltr<'a> {
    pub fn new(
        generator: CandidateGenerator,
        extractor: FeatureExtractor<'a>,
        ranker: Ranker,
        threshold: f64,
        snapshot: KbSnapshot,
    ) -> Self {
        Ltr {
            generator,
            extractor,
            ranker,
            greedy: Greedy::new(threshold),
            snapshot,
        }
    }

    /// One instance per candidate (mention, entity) pair, with features.
    pub fn instances(&mut self, query: &Query) -> Result<Instances> {
        let candidates = self.generator.generate(query)?;
        let mut instances = Instances::default();
        for (mention, entities) in &candidates {
            for en_id in entities.keys() {
                if !self.snapshot.is_name_entity(en_id) {
                    continue;
                }
                let mut ins = Instance::new(format!("{}-{}-{}", query.qid(), en_id, mention));
                ins.add_property(PROP_QID, query.qid());
                ins.add_property(PROP_QUERY, query.raw());
                ins.add_property(PROP_MENTION, mention.as_str());
                ins.add_property(PROP_ENTITY, en_id.as_str());
                ins.set_features(self.extractor.extract(en_id, mention, query));
                instances.push(ins);
            }
        }
        debug!(
            "Query [{}]: {} mentions, {} instances",
            query.qid(),
            candidates.len(),
            instances.len()
        );
        Ok(instances)
    }

    /// Scored candidate instances.
    pub fn rank_ens(&mut self, query: &Query) -> Result<Instances> {
        let mut instances = self.instances(query)?;
        self.ranker.apply(&mut instances)?;
        Ok(instances)
    }

    pub fn interpretations(&self, instances: &Instances) -> Vec<Interpretation> {
        self.greedy.disambiguate(instances)
    }

    /// Unique (mention, entity) pairs of all interpretation sets.
    pub fn disambiguate(&self, instances: &Instances) -> Vec<LinkedEntity> {
        greedy::flatten(&self.interpretations(instances))
    }

    pub fn link(&mut self, query: &Query) -> Result<Vec<LinkedEntity>> {
        let instances = self.rank_ens(query)?;
        Ok(self.disambiguate(&instances))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityCatalog, MemoryStore};
    use crate::ml::Category;
    use crate::ml::models::{DecisionTree, EnsembleKind, TreeEnsemble, TreeNode};
    use crate::stats::{MemoryIndex, StatsCache};
    use std::sync::Arc;

    fn catalog() -> EntityCatalog {
        let entities = MemoryStore::from_json_str(
            r#"{"<dbpedia:Barack_Obama>": {"<rdfs:label>": ["Barack Obama"]},
                "<dbpedia:Honolulu>": {"<rdfs:label>": ["Honolulu"]}}"#,
        )
        .unwrap();
        let surface_forms = MemoryStore::from_json_str(
            r#"{"barack obama": {"facc12": {"<dbpedia:Barack_Obama>": 50}},
                "obama": {"facc12": {"<dbpedia:Barack_Obama>": 30, "<dbpedia:Obama_Japan>": 5}},
                "honolulu": {"facc12": {"<dbpedia:Honolulu>": 10}}}"#,
        )
        .unwrap();
        EntityCatalog::new(Arc::new(entities), Arc::new(surface_forms))
    }

    /// Scores each instance with its commonness.
    fn commonness_ranker() -> Ranker {
        let names = [
            "commonness", "context_sim", "len_ratio", "lm_score", "matches", "mct",
            "mention_len", "outlinks", "pos1", "redirects", "tcm", "tem",
        ];
        let mut nodes = vec![TreeNode::Split {
            feature: 0,
            threshold: 0.5,
            left: 1,
            right: 2,
        }];
        nodes.push(TreeNode::Leaf { value: 0.05 });
        nodes.push(TreeNode::Leaf { value: 0.9 });
        let model = TreeEnsemble::new(
            EnsembleKind::Rf,
            Category::Regression,
            names.iter().map(|s| s.to_string()).collect(),
            1.0,
            0.0,
            vec![DecisionTree::new(nodes)],
        )
        .unwrap();
        Ranker::new(Arc::new(model))
    }

    fn ltr(index: &MemoryIndex, snapshot: KbSnapshot) -> Ltr<'_> {
        let catalog = catalog();
        let generator = CandidateGenerator::new(catalog.clone(), vec!["facc12".into()], Some(0.1));
        let extractor =
            FeatureExtractor::new(catalog, StatsCache::new(index), vec!["facc12".into()], "catchall");
        Ltr::new(generator, extractor, commonness_ranker(), 0.1, snapshot)
    }

    #[test]
    fn test_instances_carry_properties() {
        let index = MemoryIndex::new();
        let mut ltr = ltr(&index, KbSnapshot::unloaded());
        let inss = ltr.instances(&Query::with_id("Obama", "q7")).unwrap();
        assert_eq!(inss.len(), 2);
        let ins = &inss.all()[0];
        assert_eq!(ins.id(), "q7-<dbpedia:Barack_Obama>-obama");
        assert_eq!(ins.property_str(PROP_QID).as_deref(), Some("q7"));
        assert_eq!(ins.property_str(PROP_QUERY).as_deref(), Some("Obama"));
        assert_eq!(ins.features().len(), 12);
    }

    #[test]
    fn test_link() {
        let index = MemoryIndex::new();
        let mut ltr = ltr(&index, KbSnapshot::unloaded());
        let linked = ltr.link(&Query::new("barack obama born honolulu")).unwrap();
        assert_eq!(
            linked,
            vec![
                LinkedEntity::new("barack obama", "<dbpedia:Barack_Obama>", 0.9),
                LinkedEntity::new("honolulu", "<dbpedia:Honolulu>", 0.9),
            ]
        );
    }

    #[test]
    fn test_snapshot_filters_candidates() {
        let index = MemoryIndex::new();
        let mut ltr = ltr(&index, KbSnapshot::from_ids(["<dbpedia:Honolulu>"]));
        let inss = ltr.rank_ens(&Query::new("barack obama born honolulu")).unwrap();
        assert_eq!(inss.len(), 1);
        assert_eq!(inss.all()[0].score, Some(0.9));
    }
}
