//! Command implementations for the lexlink CLI.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use log::{debug, info};

use crate::analysis::Analyzer;
use crate::catalog::{EntityCatalog, MemoryStore};
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::{FieldSpec, LinkingConfig, RetrievalConfig, ScorerConfig, TtiConfig, TtiMethod};
use crate::error::{LexlinkError, Result};
use crate::linking::EntityLinker;
use crate::retrieval::{ElrResources, Retrieval};
use crate::scoring::elr::ElrFieldMapper;
use crate::scoring::smoothing::{AVG_LEN, SmoothingParam};
use crate::scoring::{DocumentScorer, FieldMapping, Scorer};
use crate::stats::{MemoryIndex, StatsCache, TextSearchService};
use crate::tti::TargetTypeIdentifier;

/// Entity documents inside a `--store` directory.
pub const ENTITIES_FILE: &str = "entities.json";
/// Surface-form count tables inside a `--store` directory.
pub const SURFACE_FORMS_FILE: &str = "surface_forms.json";
/// Optional Freebase to DBpedia id map inside a `--store` directory.
pub const ID_MAP_FILE: &str = "fb2dbp.json";

/// Execute a CLI command.
pub fn execute_command(args: LexlinkArgs) -> anyhow::Result<()> {
    let (message, output) = match &args.command {
        Command::Retrieve(retrieve_args) => (
            "Retrieval results",
            retrieve(retrieve_args)
                .with_context(|| format!("retrieve with {}", retrieve_args.config.display()))?,
        ),
        Command::Link(link_args) => (
            "Linked entities",
            link(link_args).with_context(|| format!("link with {}", link_args.config.display()))?,
        ),
        Command::Score(score_args) => (
            "Document score",
            score(score_args).with_context(|| format!("score {}", score_args.doc))?,
        ),
        Command::MapFields(map_args) => (
            "Field mapping",
            map_fields(map_args).with_context(|| format!("map fields of \"{}\"", map_args.term))?,
        ),
        Command::Tti(tti_args) => (
            "Target types",
            tti(tti_args).with_context(|| format!("identify types with {}", tti_args.config.display()))?,
        ),
    };
    output_result(message, &output, &args).context("write command output")
}

/// Process exit code of a failed command: 2 for configuration problems
/// reported before any scoring, 1 otherwise.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<LexlinkError>() {
        Some(e) if e.is_fatal_config() => 2,
        _ => 1,
    }
}

/// Retrieve documents for one query, or run the configured batch.
pub fn retrieve(args: &RetrieveArgs) -> Result<CommandOutput> {
    let config = RetrievalConfig::from_file(&args.config)?;
    let index_file = args
        .index
        .clone()
        .or_else(|| config.index_file.clone())
        .ok_or_else(|| LexlinkError::config("an index file is required for retrieval"))?;
    let index = load_index(&index_file)?;
    let elr_config = config.elr.clone();
    let uri_index = match &elr_config {
        Some(elr) => {
            let path = args
                .uri_index
                .as_ref()
                .or(elr.uri_index_file.as_ref())
                .ok_or_else(|| LexlinkError::config("a URI index file is required for ELR"))?;
            Some(load_uri_index(path)?)
        }
        None => None,
    };

    let start = Instant::now();
    let model = match &elr_config {
        Some(_) => "elr".to_string(),
        None => config.scorer.model.clone(),
    };
    let num_docs = config.num_docs;
    let mut retrieval = Retrieval::new(config, &index)?;
    if let (Some(elr), Some(uri_index)) = (&elr_config, &uri_index) {
        retrieval = retrieval.with_elr(ElrResources::load(uri_index, elr)?);
    }
    match &args.query {
        Some(query) => {
            let annotations = retrieval.query_annotations(&args.qid);
            let results = retrieval.retrieve_annotated(query, &annotations)?;
            let docs = results.sorted().into_iter().take(num_docs).cloned().collect();
            Ok(CommandOutput::Retrieve(RetrieveResult {
                query: query.clone(),
                model,
                docs,
                duration_ms: start.elapsed().as_millis() as u64,
            }))
        }
        None => {
            retrieval.run_batch()?;
            Ok(CommandOutput::Batch(BatchResult {
                command: "retrieve".to_string(),
                output_file: display_path(&retrieval.config().output_file),
                duration_ms: start.elapsed().as_millis() as u64,
            }))
        }
    }
}

/// Link one query, or run the configured linking step.
pub fn link(args: &LinkArgs) -> Result<CommandOutput> {
    let config = LinkingConfig::from_file(&args.config)?;
    let catalog = load_catalog(&args.store)?;
    let index = match args.index.as_ref().or(config.index_file.as_ref()) {
        Some(path) => load_index(path)?,
        None => MemoryIndex::new(),
    };

    let start = Instant::now();
    let mut linker = EntityLinker::new(config, catalog, &index)?;
    match &args.query {
        Some(query) => Ok(CommandOutput::Link(linker.link(query, &args.qid)?)),
        None => {
            linker.batch_linking()?;
            Ok(CommandOutput::Batch(BatchResult {
                command: "link".to_string(),
                output_file: display_path(&linker.config().output_file),
                duration_ms: start.elapsed().as_millis() as u64,
            }))
        }
    }
}

/// Score a single document.
pub fn score(args: &ScoreArgs) -> Result<CommandOutput> {
    let index = load_index(&args.index)?;
    let config = scorer_config(args)?;
    config.validate()?;

    let analyzed = index.analyze_query(&args.query)?;
    let terms: Vec<String> = analyzed.split_whitespace().map(str::to_string).collect();
    debug!("Analyzed query: {analyzed}");

    let mut scorer = Scorer::from_config(&config, terms)?;
    let mut cache = StatsCache::new(&index);
    let score = scorer.score(&mut cache, &args.doc)?;
    Ok(CommandOutput::Score(ScoreResult {
        doc_id: args.doc.clone(),
        model: scorer.name().to_string(),
        query: args.query.clone(),
        score,
    }))
}

/// Field mapping probabilities of a term.
pub fn map_fields(args: &MapFieldsArgs) -> Result<CommandOutput> {
    let index = if args.uri {
        load_uri_index(&args.index)?
    } else {
        load_index(&args.index)?
    };
    let analyzed = index.analyze_query(&args.term)?;
    let term = analyzed
        .split_whitespace()
        .next()
        .ok_or_else(|| LexlinkError::query(format!("\"{}\" has no indexable term", args.term)))?
        .to_string();

    let fields = if args.fields.is_empty() {
        index.fields()
    } else {
        args.fields.clone()
    };
    let mut cache = StatsCache::new(&index);
    let probs = match args.top {
        Some(n) => ElrFieldMapper::new(fields, n).map(&mut cache, &term)?,
        None => FieldMapping::new(fields).mapping_prob(&mut cache, &term)?,
    };
    Ok(CommandOutput::MapFields(MapFieldsResult {
        term,
        mapping: probs,
    }))
}

/// Identify the target types of one query, or run the configured batch.
pub fn tti(args: &TtiArgs) -> Result<CommandOutput> {
    let config = TtiConfig::from_file(&args.config)?;
    let index_file = args
        .index
        .clone()
        .or_else(|| config.index_file.clone())
        .ok_or_else(|| LexlinkError::config("an index file is required for identification"))?;
    let catalog = match (&args.store, config.method) {
        (Some(store), _) => Some(load_catalog(store)?),
        (None, TtiMethod::Ec) => {
            return Err(LexlinkError::config(
                "a store directory is required for entity-centric identification",
            ));
        }
        (None, TtiMethod::Tc) => None,
    };
    let index = load_index(&index_file)?;

    let start = Instant::now();
    let mut identifier = TargetTypeIdentifier::new(config, &index)?;
    if let Some(catalog) = catalog {
        identifier = identifier.with_catalog(catalog);
    }
    match &args.query {
        Some(query) => Ok(CommandOutput::Tti(identifier.identify(query)?)),
        None => {
            identifier.batch_identification()?;
            Ok(CommandOutput::Batch(BatchResult {
                command: "tti".to_string(),
                output_file: display_path(&identifier.config().output_file),
                duration_ms: start.elapsed().as_millis() as u64,
            }))
        }
    }
}

/// Scorer settings from the `score` arguments.
fn scorer_config(args: &ScoreArgs) -> Result<ScorerConfig> {
    let fields = match args.model.to_lowercase().as_str() {
        _ if args.fields.is_empty() => None,
        "lm" if args.fields.len() == 1 => Some(FieldSpec::Single(args.fields[0].clone())),
        "mlm" => Some(FieldSpec::Weighted(parse_field_weights(&args.fields)?)),
        _ => Some(FieldSpec::List(args.fields.clone())),
    };
    let smoothing_param = args
        .param
        .as_deref()
        .map(parse_smoothing_param)
        .transpose()?;
    Ok(ScorerConfig {
        model: args.model.clone(),
        fields,
        smoothing_method: args.smoothing.clone(),
        smoothing_param,
    })
}

/// `name:weight` pairs; fields without a weight share the remaining mass
/// equally.
fn parse_field_weights(specs: &[String]) -> Result<BTreeMap<String, f64>> {
    let mut weights = BTreeMap::new();
    let mut unweighted = Vec::new();
    for spec in specs {
        match spec.split_once(':') {
            Some((field, weight)) => {
                let weight: f64 = weight.trim().parse().map_err(|_| {
                    LexlinkError::config(format!("invalid weight in \"{spec}\""))
                })?;
                weights.insert(field.trim().to_string(), weight);
            }
            None => unweighted.push(spec.trim().to_string()),
        }
    }
    if !unweighted.is_empty() {
        let rest = (1.0 - weights.values().sum::<f64>()).max(0.0);
        let share = rest / unweighted.len() as f64;
        for field in unweighted {
            weights.insert(field, share);
        }
    }
    Ok(weights)
}

fn parse_smoothing_param(value: &str) -> Result<SmoothingParam> {
    if value == AVG_LEN {
        return Ok(SmoothingParam::AvgLen);
    }
    value
        .parse()
        .map(SmoothingParam::Value)
        .map_err(|_| LexlinkError::config(format!("invalid smoothing parameter \"{value}\"")))
}

fn load_index(path: &Path) -> Result<MemoryIndex> {
    let index = MemoryIndex::from_json_file(path)?;
    info!("Indexed {} documents from {}", index.num_docs(), path.display());
    Ok(index)
}

fn load_uri_index(path: &Path) -> Result<MemoryIndex> {
    let index = MemoryIndex::from_json_file_with_analyzer(path, Analyzer::uri())?;
    info!("Indexed URIs of {} documents from {}", index.num_docs(), path.display());
    Ok(index)
}

/// Catalog backed by the JSON files of a store directory.
pub fn load_catalog(dir: &Path) -> Result<EntityCatalog> {
    let entities = MemoryStore::from_json_file(dir.join(ENTITIES_FILE))?;
    let surface_forms = MemoryStore::from_json_file(dir.join(SURFACE_FORMS_FILE))?;
    info!(
        "Loaded {} entities and {} surface forms from {}",
        entities.len(),
        surface_forms.len(),
        dir.display()
    );
    let catalog = EntityCatalog::new(Arc::new(entities), Arc::new(surface_forms));
    let id_map = dir.join(ID_MAP_FILE);
    if id_map.exists() {
        return Ok(catalog.with_id_map(Arc::new(MemoryStore::from_json_file(id_map)?)));
    }
    Ok(catalog)
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}
