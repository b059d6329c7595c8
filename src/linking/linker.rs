//! The entity linking service.
//!
//! Dispatches on the configured method (`cmns` or `ltr`) and step:
//!
//! - `linking`: link each query and write ELQ evaluation lines (plus the
//!   full results as JSON when `json_file` is set),
//! - `ranking`: score candidate instances only and write them as a TREC run
//!   (plus the instances as JSON when `json_file` is set),
//! - `disambiguation`: read pre-scored instances from `test_set`, group them
//!   by query and run the disambiguation stage only.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::catalog::{EntityCatalog, KbSnapshot};
use crate::config::{LinkingConfig, LinkingMethod, LinkingStep};
use crate::error::{LexlinkError, Result};
use crate::linking::cmns::{CandidateGenerator, Cmns};
use crate::linking::features::{FTR_COMMONNESS, FeatureExtractor};
use crate::linking::greedy::{PROP_ENTITY, PROP_MENTION};
use crate::linking::ltr::{Ltr, PROP_QID, PROP_QUERY};
use crate::linking::{CandidateMap, LinkedEntity, write_elq_eval};
use crate::ml::{Instance, Instances, Ranker, RankingModel, TreeEnsemble};
use crate::query::Query;
use crate::retrieval::RetrievalResults;
use crate::retrieval::engine::load_queries;
use crate::stats::{StatsCache, TextSearchService};

/// Linking result of one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkingOutput {
    pub query: String,
    pub processed_query: String,
    pub results: Vec<LinkedEntity>,
}

#[derive(Debug)]
enum Method<'a> {
    Cmns(Cmns),
    Ltr(Box<Ltr<'a>>),
}

/// Entity linker configured from a [`LinkingConfig`].
#[derive(Debug)]
pub struct EntityLinker<'a> {
    config: LinkingConfig,
    method: Method<'a>,
}

impl<'a> EntityLinker<'a> {
    /// Build the linker, loading the KB snapshot and the ranker artifact
    /// named in the configuration.
    pub fn new(
        config: LinkingConfig,
        catalog: EntityCatalog,
        service: &'a dyn TextSearchService,
    ) -> Result<Self> {
        config.validate()?;
        let snapshot = match &config.kb_snapshot {
            Some(path) => KbSnapshot::load(path)?,
            None => KbSnapshot::unloaded(),
        };
        let model: Option<Arc<dyn RankingModel>> = match (&config.method, &config.model_file) {
            (LinkingMethod::Ltr, Some(path)) => Some(Arc::new(TreeEnsemble::load(path)?)),
            _ => None,
        };
        Self::from_parts(config, catalog, service, snapshot, model)
    }

    /// Build the linker from already loaded parts.
    pub fn from_parts(
        config: LinkingConfig,
        catalog: EntityCatalog,
        service: &'a dyn TextSearchService,
        snapshot: KbSnapshot,
        model: Option<Arc<dyn RankingModel>>,
    ) -> Result<Self> {
        let generator = CandidateGenerator::new(
            catalog.clone(),
            config.sf_sources.clone(),
            Some(config.cmns_threshold),
        );
        let method = match config.method {
            LinkingMethod::Cmns => Method::Cmns(Cmns::new(generator, config.threshold, snapshot)),
            LinkingMethod::Ltr => {
                let model = model
                    .ok_or_else(|| LexlinkError::config("LTR linking requires a ranker model"))?;
                let ranker = match config.category {
                    Some(category) => Ranker::with_category(model, category)?,
                    None => Ranker::new(model),
                };
                let mut extractor = FeatureExtractor::new(
                    catalog,
                    StatsCache::new(service),
                    config.sf_sources.clone(),
                    &config.similarity_field,
                );
                if let Some(weights) = &config.mlm_fields {
                    extractor = extractor.with_mlm_fields(weights.clone());
                }
                Method::Ltr(Box::new(Ltr::new(
                    generator,
                    extractor,
                    ranker,
                    config.threshold,
                    snapshot,
                )))
            }
        };
        Ok(EntityLinker { config, method })
    }

    pub fn config(&self) -> &LinkingConfig {
        &self.config
    }

    /// Link a query.
    pub fn link(&mut self, query: &str, qid: &str) -> Result<LinkingOutput> {
        info!("Linking query {qid} [{query}]");
        let q = Query::with_id(query, qid);
        let results = match &mut self.method {
            Method::Cmns(cmns) => cmns.link(&q)?,
            Method::Ltr(ltr) => ltr.link(&q)?,
        };
        Ok(LinkingOutput {
            query: q.raw().to_string(),
            processed_query: q.normalized().to_string(),
            results,
        })
    }

    /// Scored candidate instances of a query. For the commonness method the
    /// score is the commonness itself.
    pub fn rank(&mut self, query: &str, qid: &str) -> Result<Instances> {
        let q = Query::with_id(query, qid);
        match &mut self.method {
            Method::Cmns(cmns) => Ok(commonness_instances(&q, &cmns.rank_ens(&q)?)),
            Method::Ltr(ltr) => ltr.rank_ens(&q),
        }
    }

    /// Disambiguate pre-scored instances of one query.
    pub fn disambiguate(&self, instances: &Instances) -> Vec<LinkedEntity> {
        match &self.method {
            Method::Cmns(cmns) => cmns.disambiguate(&candidate_map(instances)),
            Method::Ltr(ltr) => ltr.disambiguate(instances),
        }
    }

    /// Run the configured step over the query file (or test set) and write
    /// the output files.
    pub fn batch_linking(&mut self) -> Result<()> {
        let output_file = required(&self.config.output_file, "output_file")?;
        match self.config.step {
            LinkingStep::Linking => self.batch_link(&output_file)?,
            LinkingStep::Ranking => self.batch_rank(&output_file)?,
            LinkingStep::Disambiguation => self.batch_disambiguate(&output_file)?,
        }
        info!("Output file: {}", output_file.display());
        Ok(())
    }

    fn batch_link(&mut self, output_file: &Path) -> Result<()> {
        let queries = load_queries(required(&self.config.query_file, "query_file")?)?;
        let mut results = BTreeMap::new();
        for (qid, query) in &queries {
            results.insert(qid.clone(), self.link(query, qid)?);
        }

        let annotations = results
            .iter()
            .map(|(qid, out)| (qid.clone(), out.results.clone()))
            .collect();
        write_elq_eval(&annotations, output_file)?;
        if let Some(json_file) = &self.config.json_file {
            write_json(&results, json_file)?;
        }
        Ok(())
    }

    fn batch_rank(&mut self, output_file: &Path) -> Result<()> {
        let queries = load_queries(required(&self.config.query_file, "query_file")?)?;
        let run_id = match self.config.method {
            LinkingMethod::Cmns => "cmns",
            LinkingMethod::Ltr => "ltr",
        };

        let mut ranked = Instances::default();
        let mut run = String::new();
        for (qid, query) in &queries {
            let instances = self.rank(query, qid)?;
            run.push_str(&entity_ranking(&instances).to_trec(qid, run_id, usize::MAX));
            ranked.extend(instances);
        }

        std::fs::write(output_file, run)?;
        if let Some(json_file) = &self.config.json_file {
            ranked.to_json_file(json_file)?;
        }
        Ok(())
    }

    fn batch_disambiguate(&mut self, output_file: &Path) -> Result<()> {
        let test_set = required(&self.config.test_set, "test_set")?;
        let instances = Instances::from_json_file(&test_set)?;

        let mut annotations = BTreeMap::new();
        for (qid, q_instances) in instances.group_by_property(PROP_QID) {
            annotations.insert(qid, self.disambiguate(&q_instances));
        }

        write_elq_eval(&annotations, output_file)?;
        if let Some(json_file) = &self.config.json_file {
            let results: BTreeMap<&String, serde_json::Value> = annotations
                .iter()
                .map(|(qid, linked)| (qid, serde_json::json!({ "results": linked })))
                .collect();
            write_json(&results, json_file)?;
        }
        Ok(())
    }
}

fn required(path: &Option<PathBuf>, name: &str) -> Result<PathBuf> {
    path.clone()
        .ok_or_else(|| LexlinkError::config(format!("{name} is required for this step")))
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    info!("JSON output: {}", path.display());
    Ok(())
}

/// Instances scored by commonness, one per candidate.
fn commonness_instances(query: &Query, candidates: &CandidateMap) -> Instances {
    let mut instances = Instances::default();
    for (mention, entities) in candidates {
        for (en_id, cmns) in entities {
            let mut ins = Instance::new(format!("{}-{}-{}", query.qid(), en_id, mention));
            ins.add_property(PROP_QID, query.qid());
            ins.add_property(PROP_QUERY, query.raw());
            ins.add_property(PROP_MENTION, mention.as_str());
            ins.add_property(PROP_ENTITY, en_id.as_str());
            ins.add_feature(FTR_COMMONNESS, *cmns);
            ins.score = Some(*cmns);
            instances.push(ins);
        }
    }
    instances
}

/// `{mention: {entity: score}}` of scored instances.
fn candidate_map(instances: &Instances) -> CandidateMap {
    let mut map = CandidateMap::new();
    for ins in instances.all() {
        let (Some(mention), Some(en_id), Some(score)) = (
            ins.property_str(PROP_MENTION),
            ins.property_str(PROP_ENTITY),
            ins.score,
        ) else {
            continue;
        };
        let entry = map.entry(mention).or_default().entry(en_id).or_insert(score);
        if score > *entry {
            *entry = score;
        }
    }
    map
}

/// Best score of each entity over all its mentions.
fn entity_ranking(instances: &Instances) -> RetrievalResults {
    let mut best: BTreeMap<String, f64> = BTreeMap::new();
    for ins in instances.all() {
        let (Some(en_id), Some(score)) = (ins.property_str(PROP_ENTITY), ins.score) else {
            continue;
        };
        let entry = best.entry(en_id).or_insert(score);
        if score > *entry {
            *entry = score;
        }
    }
    best.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryStore;
    use crate::stats::MemoryIndex;

    fn catalog() -> EntityCatalog {
        let surface_forms = MemoryStore::from_json_str(
            r#"{"barack obama": {"facc12": {"<dbpedia:Barack_Obama>": 50}},
                "honolulu": {"facc12": {"<dbpedia:Honolulu>": 10}}}"#,
        )
        .unwrap();
        EntityCatalog::new(Arc::new(MemoryStore::new()), Arc::new(surface_forms))
    }

    fn cmns_config() -> LinkingConfig {
        LinkingConfig {
            method: LinkingMethod::Cmns,
            ..LinkingConfig::default()
        }
    }

    #[test]
    fn test_link_output() {
        let index = MemoryIndex::new();
        let mut linker = EntityLinker::new(cmns_config(), catalog(), &index).unwrap();
        let out = linker.link("Barack Obama born in Honolulu", "q1").unwrap();
        assert_eq!(out.query, "Barack Obama born in Honolulu");
        assert_eq!(out.processed_query, "barack obama born in honolulu");
        assert_eq!(out.results.len(), 2);
    }

    #[test]
    fn test_rank_with_commonness() {
        let index = MemoryIndex::new();
        let mut linker = EntityLinker::new(cmns_config(), catalog(), &index).unwrap();
        let inss = linker.rank("barack obama honolulu", "q1").unwrap();
        assert_eq!(inss.len(), 2);
        assert!(inss.all().iter().all(|i| i.score == Some(1.0)));
        let ranking = entity_ranking(&inss);
        assert_eq!(ranking.num_docs(), 2);
    }

    #[test]
    fn test_ltr_requires_model() {
        let index = MemoryIndex::new();
        let err = EntityLinker::from_parts(
            LinkingConfig::default(),
            catalog(),
            &index,
            KbSnapshot::unloaded(),
            None,
        )
        .unwrap_err();
        assert!(err.is_fatal_config());
    }

    #[test]
    fn test_batch_steps() {
        let dir = tempfile::tempdir().unwrap();
        let query_file = dir.path().join("queries.json");
        std::fs::write(
            &query_file,
            r#"{"q2": "honolulu", "q1": "barack obama"}"#,
        )
        .unwrap();
        let index = MemoryIndex::new();

        // linking
        let mut config = cmns_config();
        config.query_file = Some(query_file.clone());
        config.output_file = Some(dir.path().join("elq.txt"));
        config.json_file = Some(dir.path().join("results.json"));
        EntityLinker::new(config.clone(), catalog(), &index)
            .unwrap()
            .batch_linking()
            .unwrap();
        let elq = std::fs::read_to_string(dir.path().join("elq.txt")).unwrap();
        assert_eq!(elq, "q1\t1\t<dbpedia:Barack_Obama>\nq2\t1\t<dbpedia:Honolulu>\n");
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("results.json")).unwrap())
                .unwrap();
        assert_eq!(json["q2"]["processed_query"], "honolulu");

        // ranking
        config.step = LinkingStep::Ranking;
        config.output_file = Some(dir.path().join("run.txt"));
        config.json_file = Some(dir.path().join("instances.json"));
        EntityLinker::new(config.clone(), catalog(), &index)
            .unwrap()
            .batch_linking()
            .unwrap();
        let run = std::fs::read_to_string(dir.path().join("run.txt")).unwrap();
        assert_eq!(run, "q1\tQ0\t<dbpedia:Barack_Obama>\t1\t1\tcmns\nq2\tQ0\t<dbpedia:Honolulu>\t1\t1\tcmns\n");

        // disambiguation of the ranked instances
        config.step = LinkingStep::Disambiguation;
        config.test_set = Some(dir.path().join("instances.json"));
        config.output_file = Some(dir.path().join("elq2.txt"));
        config.json_file = None;
        EntityLinker::new(config, catalog(), &index)
            .unwrap()
            .batch_linking()
            .unwrap();
        let elq2 = std::fs::read_to_string(dir.path().join("elq2.txt")).unwrap();
        assert_eq!(elq2, elq);
    }
}
