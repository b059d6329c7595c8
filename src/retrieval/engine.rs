//! Two-pass document retrieval.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::config::{ElrConfig, RetrievalConfig};
use crate::error::{LexlinkError, Result};
use crate::retrieval::trec::{RetrievalResults, ScoredDoc};
use crate::scoring::elr::{self, EntityAnnotations, EntityFieldMappings};
use crate::scoring::{DocumentScorer, Scorer, ScorerElr};
use crate::stats::{StatsCache, TextSearchService};

/// Load a batch query file `{qid: query}`.
pub fn load_queries<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let queries: BTreeMap<String, String> = serde_json::from_str(&content)?;
    info!("Loaded {} queries from {}", queries.len(), path.display());
    Ok(queries)
}

/// Inputs of ELR scoring besides its settings.
#[derive(Debug, Clone)]
pub struct ElrResources<'a> {
    /// Index whose field terms are entity URIs.
    pub uri_service: &'a dyn TextSearchService,
    /// Annotations per query id.
    pub annotations: BTreeMap<String, EntityAnnotations>,
    pub mappings: Arc<EntityFieldMappings>,
}

impl<'a> ElrResources<'a> {
    pub fn new(uri_service: &'a dyn TextSearchService) -> Self {
        ElrResources {
            uri_service,
            annotations: BTreeMap::new(),
            mappings: Arc::new(EntityFieldMappings::new()),
        }
    }

    /// Load the annotation and mapping files named in the settings.
    pub fn load(uri_service: &'a dyn TextSearchService, config: &ElrConfig) -> Result<Self> {
        let mut resources = Self::new(uri_service);
        if let Some(path) = &config.annot_file {
            resources.annotations = elr::load_annotations(path, config.annot_threshold)?;
        }
        if let Some(path) = &config.mapping_file {
            resources.mappings = Arc::new(elr::load_field_mappings(path)?);
            info!("Loaded field mappings of {} entities", resources.mappings.len());
        }
        Ok(resources)
    }

    pub fn with_annotations(mut self, annotations: BTreeMap<String, EntityAnnotations>) -> Self {
        self.annotations = annotations;
        self
    }
}

/// First-pass search followed by language-model re-scoring.
#[derive(Debug)]
pub struct Retrieval<'a> {
    config: RetrievalConfig,
    service: &'a dyn TextSearchService,
    elr: Option<ElrResources<'a>>,
}

impl<'a> Retrieval<'a> {
    pub fn new(config: RetrievalConfig, service: &'a dyn TextSearchService) -> Result<Self> {
        config.validate()?;
        Ok(Retrieval {
            config,
            service,
            elr: None,
        })
    }

    /// Attach the URI index and annotations used when ELR is configured.
    pub fn with_elr(mut self, resources: ElrResources<'a>) -> Self {
        self.elr = Some(resources);
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Annotations of a query id; empty when there are none.
    pub fn query_annotations(&self, qid: &str) -> EntityAnnotations {
        self.elr
            .as_ref()
            .and_then(|elr| elr.annotations.get(qid))
            .cloned()
            .unwrap_or_default()
    }

    /// Score documents for a query with a fresh statistics cache.
    pub fn retrieve(&self, query: &str) -> Result<RetrievalResults> {
        self.retrieve_annotated(query, &EntityAnnotations::new())
    }

    /// [`Retrieval::retrieve`] with the query's entity annotations.
    pub fn retrieve_annotated(
        &self,
        query: &str,
        annotations: &EntityAnnotations,
    ) -> Result<RetrievalResults> {
        let mut cache = StatsCache::new(self.service);
        self.retrieve_with_cache(&mut cache, query, annotations)
    }

    /// Score documents for a query.
    ///
    /// With the `bm25` model the first-pass scores are returned. Otherwise
    /// the first-pass hits are re-scored and documents without a score are
    /// left out. Annotations are read only when ELR is configured.
    pub fn retrieve_with_cache(
        &self,
        cache: &mut StatsCache<'_>,
        query: &str,
        annotations: &EntityAnnotations,
    ) -> Result<RetrievalResults> {
        let analyzed = self.service.analyze_query(query)?;
        let hits = self.first_pass(&analyzed)?;
        if self.config.is_first_pass_only() {
            return Ok(hits);
        }

        let terms: Vec<String> = analyzed.split_whitespace().map(str::to_string).collect();
        let mut scorer = Scorer::from_config(&self.config.scorer, terms)?;
        let Some(elr_config) = &self.config.elr else {
            return self.second_pass(cache, hits, &mut scorer);
        };
        let resources = self
            .elr
            .as_ref()
            .ok_or_else(|| LexlinkError::config("ELR scoring needs a URI index"))?;
        let mut scorer = ScorerElr::new(
            scorer,
            StatsCache::new(resources.uri_service),
            annotations,
            elr_config,
        )
        .with_field_mappings(Arc::clone(&resources.mappings));
        debug!("Query entities: {:?}", scorer.entities());
        let doc_ids: Vec<String> = hits.sorted().iter().map(|d| d.doc_id.clone()).collect();
        scorer.prefetch(&doc_ids)?;
        self.second_pass(cache, hits, &mut scorer)
    }

    fn first_pass(&self, analyzed_query: &str) -> Result<RetrievalResults> {
        debug!("First pass scoring...");
        let first_pass = &self.config.first_pass;
        let fields_return = first_pass.fields_return();
        let hits = self.service.search(
            analyzed_query,
            &first_pass.field,
            first_pass.num_docs,
            self.config.start,
        )?;

        let mut results = RetrievalResults::new();
        for hit in hits {
            let fields = hit
                .fields
                .into_iter()
                .filter(|(name, _)| fields_return.contains(name))
                .collect();
            results.push(ScoredDoc {
                doc_id: hit.doc_id,
                score: hit.score,
                fields,
            });
        }
        Ok(results)
    }

    fn second_pass<S: DocumentScorer>(
        &self,
        cache: &mut StatsCache<'_>,
        first_pass: RetrievalResults,
        scorer: &mut S,
    ) -> Result<RetrievalResults> {
        debug!("Second pass scoring ({})...", scorer.name());
        let docs = first_pass.sorted();
        let doc_ids: Vec<String> = docs.iter().map(|d| d.doc_id.clone()).collect();
        for field in scorer.fields() {
            cache.prefetch_term_vectors(&doc_ids, &field)?;
        }

        let mut results = RetrievalResults::new();
        for doc in docs {
            match scorer.score(cache, &doc.doc_id)? {
                Some(score) => results.push(ScoredDoc {
                    doc_id: doc.doc_id.clone(),
                    score,
                    fields: doc.fields.clone(),
                }),
                None => debug!("No score for {}", doc.doc_id),
            }
        }
        Ok(results)
    }

    /// TREC run lines for every query, in sorted query id order.
    ///
    /// Queries are spread over `threads` workers; each worker owns its own
    /// statistics cache.
    pub fn batch_retrieval(&self, queries: &BTreeMap<String, String>) -> Result<String> {
        let start = Instant::now();
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .thread_name(|i| format!("retrieval-{i}"))
            .build()
            .map_err(|e| LexlinkError::other(format!("Failed to create thread pool: {e}")))?;

        let queries: Vec<(&String, &String)> = queries.iter().collect();
        let runs: Vec<String> = pool.install(|| {
            queries
                .par_iter()
                .map_init(
                    || StatsCache::new(self.service),
                    |cache, (qid, query)| {
                        info!("scoring [{qid}] {query}");
                        let annotations = self.query_annotations(qid);
                        let results = self.retrieve_with_cache(cache, query, &annotations)?;
                        Ok(results.to_trec(qid, self.config.run_id(), self.config.num_docs))
                    },
                )
                .collect::<Result<Vec<String>>>()
        })?;

        info!(
            "Retrieved {} queries in {:.2}s",
            queries.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(runs.concat())
    }

    /// Run the configured query file and write the TREC run to the output
    /// file.
    pub fn run_batch(&self) -> Result<()> {
        let query_file = self
            .config
            .query_file
            .as_ref()
            .ok_or_else(|| LexlinkError::config("query_file is required for batch retrieval"))?;
        let output_file = self
            .config
            .output_file
            .as_ref()
            .ok_or_else(|| LexlinkError::config("output_file is required for batch retrieval"))?;

        let queries = load_queries(query_file)?;
        let run = self.batch_retrieval(&queries)?;
        std::fs::write(output_file, run)?;
        info!("Output file: {}", output_file.display());
        Ok(())
    }
}
