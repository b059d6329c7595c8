//! Target type identification.
//!
//! Ranks the ontology types a query is looking for. Type-centric
//! identification retrieves types directly from an index of type documents.
//! Entity-centric identification retrieves entities and late-fuses their
//! scores into the DBpedia ontology types of each entity.
//!
//! # Examples
//!
//! ```
//! use lexlink::config::TtiConfig;
//! use lexlink::stats::MemoryIndex;
//! use lexlink::tti::TargetTypeIdentifier;
//!
//! let mut index = MemoryIndex::new();
//! index.add_document("<dbo:City>", [("content", "honolulu paris capital city")]);
//! index.add_document("<dbo:Person>", [("content", "barack obama president")]);
//!
//! let tti = TargetTypeIdentifier::new(TtiConfig::default(), &index).unwrap();
//! let output = tti.identify("capital city").unwrap();
//! assert_eq!(output.results[0].type_id, "<dbo:City>");
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::catalog::EntityCatalog;
use crate::config::{TtiConfig, TtiMethod, TtiModel};
use crate::error::{LexlinkError, Result};
use crate::retrieval::{LateFusion, Retrieval, RetrievalResults, ScoredDoc, load_queries};
use crate::stats::TextSearchService;

pub const RDF_TYPE: &str = "<rdf:type>";
pub const OWL_THING: &str = "<owl:Thing>";
pub const DBO_PREFIX: &str = "<dbo:";

/// A ranked type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetType {
    pub rank: usize,
    #[serde(rename = "type")]
    pub type_id: String,
    pub score: f64,
}

/// Types identified for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtiOutput {
    pub query: String,
    pub results: Vec<TargetType>,
}

impl TtiOutput {
    /// TREC lines of the ranked types.
    pub fn to_trec(&self, qid: &str, run_id: &str) -> String {
        let results: RetrievalResults = self
            .results
            .iter()
            .map(|t| (t.type_id.clone(), t.score))
            .collect();
        results.to_trec(qid, run_id, self.results.len())
    }
}

#[derive(Debug)]
pub struct TargetTypeIdentifier<'a> {
    config: TtiConfig,
    retrieval: Retrieval<'a>,
    catalog: Option<EntityCatalog>,
    fusion: LateFusion,
}

impl<'a> TargetTypeIdentifier<'a> {
    /// Identifier retrieving from `service`: type documents for `tc`, entity
    /// documents for `ec`.
    pub fn new(config: TtiConfig, service: &'a dyn TextSearchService) -> Result<Self> {
        config.validate()?;
        let retrieval = Retrieval::new(config.retrieval_config(), service)?;
        let fusion = LateFusion::new(config.assoc_mode);
        Ok(TargetTypeIdentifier {
            config,
            retrieval,
            catalog: None,
            fusion,
        })
    }

    /// Entity catalog providing the types of entities (`ec`).
    pub fn with_catalog(mut self, catalog: EntityCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn config(&self) -> &TtiConfig {
        &self.config
    }

    /// DBpedia ontology types of an entity, without `<owl:Thing>`.
    pub fn entity_types(&self, entity_id: &str) -> Result<Vec<String>> {
        let catalog = self.catalog.as_ref().ok_or_else(|| {
            LexlinkError::config("entity-centric identification needs an entity catalog")
        })?;
        let Some(entity) = catalog.lookup_entity(entity_id)? else {
            return Ok(Vec::new());
        };
        Ok(entity
            .values(RDF_TYPE)
            .into_iter()
            .filter(|t| *t != OWL_THING && t.starts_with(DBO_PREFIX))
            .map(str::to_string)
            .collect())
    }

    fn type_centric(&self, query: &str) -> Result<RetrievalResults> {
        debug!("TTI, TC, {:?}", self.config.model);
        self.retrieval.retrieve(query)
    }

    fn entity_centric(&self, query: &str) -> Result<RetrievalResults> {
        debug!("TTI, EC, {:?}", self.config.model);
        if self.catalog.is_none() {
            return Err(LexlinkError::config(
                "entity-centric identification needs an entity catalog",
            ));
        }
        let entities = self.retrieval.retrieve(query)?;
        let top: Vec<ScoredDoc> = entities
            .sorted()
            .into_iter()
            .take(self.config.ec_cutoff)
            .map(|doc| ScoredDoc {
                score: match self.config.model {
                    // log-likelihoods are fused as likelihoods
                    TtiModel::Lm => doc.score.exp(),
                    TtiModel::Bm25 => doc.score,
                },
                ..doc.clone()
            })
            .collect();
        let top: Vec<&ScoredDoc> = top.iter().collect();
        self.fusion.fuse(&top, |entity_id| self.entity_types(entity_id))
    }

    /// Rank target types of a query.
    pub fn identify(&self, query: &str) -> Result<TtiOutput> {
        let types = match self.config.method {
            TtiMethod::Tc => self.type_centric(query)?,
            TtiMethod::Ec => self.entity_centric(query)?,
        };
        let results = types
            .sorted()
            .into_iter()
            .take(self.config.num_docs)
            .enumerate()
            .map(|(i, doc)| TargetType {
                rank: self.config.start + i,
                type_id: doc.doc_id.clone(),
                score: doc.score,
            })
            .collect();
        Ok(TtiOutput {
            query: query.to_string(),
            results,
        })
    }

    /// Identify the types of every query in `query_file`, writing JSON to
    /// `output_file` and, when set, a TREC run to `trec_output_file`.
    pub fn batch_identification(&self) -> Result<BTreeMap<String, TtiOutput>> {
        let query_file = self.config.query_file.as_ref().ok_or_else(|| {
            LexlinkError::config("query_file is required for batch identification")
        })?;
        let output_file = self.config.output_file.as_ref().ok_or_else(|| {
            LexlinkError::config("output_file is required for batch identification")
        })?;

        let queries = load_queries(query_file)?;
        let mut results = BTreeMap::new();
        let mut run = String::new();
        for (qid, query) in &queries {
            info!("Identifying target types for [{qid}] {query}");
            let output = self.identify(query)?;
            run.push_str(&output.to_trec(qid, &self.config.run_id));
            results.insert(qid.clone(), output);
        }

        write_json(&results, output_file)?;
        if let Some(trec_file) = &self.config.trec_output_file {
            std::fs::write(trec_file, run)?;
            info!("TREC output: {}", trec_file.display());
        }
        Ok(results)
    }
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    info!("Output file: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryStore;
    use crate::config::AssocMode;
    use crate::stats::MemoryIndex;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn type_index() -> MemoryIndex {
        let mut index = MemoryIndex::new();
        index.add_document("<dbo:City>", [("content", "honolulu paris capital city hawaii")]);
        index.add_document("<dbo:Person>", [("content", "barack obama president born")]);
        index.add_document("<dbo:Country>", [("content", "france country capital paris")]);
        index
    }

    fn entity_index() -> MemoryIndex {
        let mut index = MemoryIndex::new();
        index.add_document("<dbpedia:Honolulu>", [("names", "honolulu"), ("body", "capital of hawaii")]);
        index.add_document("<dbpedia:Paris>", [("names", "paris"), ("body", "capital of france")]);
        index.add_document("<dbpedia:Barack_Obama>", [("names", "barack obama"), ("body", "born in honolulu")]);
        index
    }

    fn catalog() -> EntityCatalog {
        let entities = MemoryStore::from_json_str(
            r#"{"<dbpedia:Honolulu>": {"<rdf:type>": ["<dbo:City>", "<dbo:Place>", "<owl:Thing>", "<schema:City>"]},
                "<dbpedia:Paris>": {"<rdf:type>": ["<dbo:City>", "<dbo:Place>"]},
                "<dbpedia:Barack_Obama>": {"<rdf:type>": ["<dbo:Person>"]}}"#,
        )
        .unwrap();
        EntityCatalog::new(Arc::new(entities), Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_type_centric_bm25() {
        let index = type_index();
        let tti = TargetTypeIdentifier::new(TtiConfig::default(), &index).unwrap();
        let output = tti.identify("capital paris").unwrap();
        assert_eq!(output.query, "capital paris");
        assert_eq!(output.results.len(), 2);
        assert_eq!(output.results[0].rank, 0);
        assert!(output.results[0].score >= output.results[1].score);
        assert!(output.results.iter().all(|t| t.type_id != "<dbo:Person>"));
    }

    #[test]
    fn test_type_centric_lm_ranks_from_start() {
        let index = type_index();
        let config = TtiConfig {
            model: TtiModel::Lm,
            num_docs: 1,
            start: 5,
            ..TtiConfig::default()
        };
        let tti = TargetTypeIdentifier::new(config, &index).unwrap();
        let output = tti.identify("obama president").unwrap();
        assert_eq!(output.results.len(), 1);
        assert_eq!(output.results[0].rank, 5);
        assert_eq!(output.results[0].type_id, "<dbo:Person>");
        assert!(output.results[0].score < 0.0);
    }

    #[test]
    fn test_entity_types_filter() {
        let index = entity_index();
        let config = TtiConfig {
            method: TtiMethod::Ec,
            ..TtiConfig::default()
        };
        let tti = TargetTypeIdentifier::new(config, &index)
            .unwrap()
            .with_catalog(catalog());
        assert_eq!(
            tti.entity_types("<dbpedia:Honolulu>").unwrap(),
            vec!["<dbo:City>", "<dbo:Place>"]
        );
        assert!(tti.entity_types("<dbpedia:Unknown>").unwrap().is_empty());
    }

    #[test]
    fn test_entity_centric_fuses_entity_scores() {
        let index = entity_index();
        let config = TtiConfig {
            method: TtiMethod::Ec,
            model: TtiModel::Lm,
            ..TtiConfig::default()
        };
        let tti = TargetTypeIdentifier::new(config, &index)
            .unwrap()
            .with_catalog(catalog());
        let output = tti.identify("capital").unwrap();
        let types: Vec<&str> = output.results.iter().map(|t| t.type_id.as_str()).collect();
        assert_eq!(types, vec!["<dbo:City>", "<dbo:Place>"]);
        assert!(output.results.iter().all(|t| t.score > 0.0 && t.score < 1.0));
    }

    #[test]
    fn test_uniform_association_averages() {
        let index = entity_index();
        let config = |assoc_mode| TtiConfig {
            method: TtiMethod::Ec,
            assoc_mode,
            ..TtiConfig::default()
        };
        let binary = TargetTypeIdentifier::new(config(AssocMode::Binary), &index)
            .unwrap()
            .with_catalog(catalog());
        let uniform = TargetTypeIdentifier::new(config(AssocMode::Uniform), &index)
            .unwrap()
            .with_catalog(catalog());
        let b = binary.identify("capital").unwrap();
        let u = uniform.identify("capital").unwrap();
        // Honolulu and Paris both vote for <dbo:City>
        assert!((u.results[0].score - b.results[0].score / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_entity_centric_requires_catalog() {
        let index = entity_index();
        let config = TtiConfig {
            method: TtiMethod::Ec,
            ..TtiConfig::default()
        };
        let tti = TargetTypeIdentifier::new(config, &index).unwrap();
        assert!(tti.identify("capital").unwrap_err().is_fatal_config());
    }

    #[test]
    fn test_batch_identification() {
        let dir = TempDir::new().unwrap();
        let query_file = dir.path().join("queries.json");
        let output_file = dir.path().join("tti.json");
        let trec_file = dir.path().join("tti.run");
        std::fs::write(&query_file, r#"{"q2": "obama president", "q1": "capital city"}"#).unwrap();

        let index = type_index();
        let config = TtiConfig {
            query_file: Some(query_file),
            output_file: Some(output_file.clone()),
            trec_output_file: Some(trec_file.clone()),
            ..TtiConfig::default()
        };
        let results = TargetTypeIdentifier::new(config, &index)
            .unwrap()
            .batch_identification()
            .unwrap();
        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["q1", "q2"]);

        let written: BTreeMap<String, TtiOutput> =
            serde_json::from_str(&std::fs::read_to_string(output_file).unwrap()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written["q1"].results[0].type_id, "<dbo:City>");
        assert_eq!(written["q2"].results[0].type_id, "<dbo:Person>");

        let run = std::fs::read_to_string(trec_file).unwrap();
        assert!(run.starts_with("q1\tQ0\t<dbo:City>\t1\t"));
        assert!(run.lines().all(|l| l.ends_with("\ttti")));
    }

    #[test]
    fn test_batch_requires_files() {
        let index = type_index();
        let tti = TargetTypeIdentifier::new(TtiConfig::default(), &index).unwrap();
        assert!(tti.batch_identification().unwrap_err().is_fatal_config());
    }
}
