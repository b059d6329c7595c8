//! Configuration of the scoring, retrieval and linking services.
//!
//! Configurations are JSON documents. Every optional key has a default, and
//! `validate()` rejects inconsistent settings with
//! [`LexlinkError::Configuration`] before any scoring starts.
//!
//! ```json
//! {
//!   "first_pass": {"num_docs": 1000, "field": "catchall"},
//!   "model": "prms",
//!   "num_docs": 100,
//!   "smoothing_method": "dirichlet",
//!   "smoothing_param": 2000,
//!   "fields": ["names", "categories", "attributes"],
//!   "query_file": "queries.json",
//!   "output_file": "run.txt",
//!   "run_id": "prms"
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{LexlinkError, Result};
use crate::ml::Category;
use crate::scoring::smoothing::{Smoothing, SmoothingParam};
use crate::stats::FIELD_CATCHALL;

/// Model name selecting first-pass ranking only.
pub const MODEL_BM25: &str = "bm25";

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        LexlinkError::config(format!("cannot read config {}: {e}", path.display()))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        LexlinkError::config(format!("invalid config {}: {e}", path.display()))
    })
}

/// The `fields` setting: a single field (LM), weighted fields (MLM) or a
/// list of fields (PRMS).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    Single(String),
    Weighted(BTreeMap<String, f64>),
    List(Vec<String>),
}

impl FieldSpec {
    /// Names of all fields, sorted for weighted fields.
    pub fn names(&self) -> Vec<String> {
        match self {
            FieldSpec::Single(f) => vec![f.clone()],
            FieldSpec::Weighted(w) => w.keys().cloned().collect(),
            FieldSpec::List(l) => l.clone(),
        }
    }
}

fn default_model() -> String {
    "lm".to_string()
}

fn default_smoothing_method() -> String {
    "dirichlet".to_string()
}

/// Retrieval model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// `lm`, `mlm` or `prms`.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldSpec>,
    /// `jm` or `dirichlet`.
    #[serde(default = "default_smoothing_method")]
    pub smoothing_method: String,
    /// λ for JM, μ (or `"avg_len"`) for Dirichlet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing_param: Option<SmoothingParam>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        ScorerConfig {
            model: default_model(),
            fields: None,
            smoothing_method: default_smoothing_method(),
            smoothing_param: None,
        }
    }
}

impl ScorerConfig {
    /// LM on a single field with default smoothing.
    pub fn lm<S: Into<String>>(field: S) -> Self {
        ScorerConfig {
            fields: Some(FieldSpec::Single(field.into())),
            ..Default::default()
        }
    }

    /// MLM over weighted fields with default smoothing.
    pub fn mlm(field_weights: BTreeMap<String, f64>) -> Self {
        ScorerConfig {
            model: "mlm".to_string(),
            fields: Some(FieldSpec::Weighted(field_weights)),
            ..Default::default()
        }
    }

    /// PRMS over a list of fields with default smoothing.
    pub fn prms(fields: Vec<String>) -> Self {
        ScorerConfig {
            model: "prms".to_string(),
            fields: Some(FieldSpec::List(fields)),
            ..Default::default()
        }
    }

    /// The validated smoothing method.
    pub fn smoothing(&self) -> Result<Smoothing> {
        Smoothing::from_method(&self.smoothing_method, self.smoothing_param)
    }

    /// The fields setting resolved for the model, with defaults applied.
    pub fn field_spec(&self) -> Result<FieldSpec> {
        match (self.model.to_lowercase().as_str(), &self.fields) {
            ("lm", None) => Ok(FieldSpec::Single(FIELD_CATCHALL.to_string())),
            ("lm", Some(spec @ FieldSpec::Single(_))) => Ok(spec.clone()),
            ("lm", Some(_)) => Err(LexlinkError::config(
                "only a single field is required for LM",
            )),
            ("mlm", None) => Err(LexlinkError::config(
                "field weights are not defined for MLM scoring",
            )),
            ("mlm", Some(FieldSpec::Weighted(weights))) => {
                if weights.is_empty() {
                    return Err(LexlinkError::config("MLM field weights are empty"));
                }
                if let Some((field, w)) = weights.iter().find(|(_, w)| !(**w >= 0.0)) {
                    return Err(LexlinkError::config(format!(
                        "MLM weight of field \"{field}\" must be non-negative, got {w}"
                    )));
                }
                Ok(FieldSpec::Weighted(weights.clone()))
            }
            ("mlm", Some(_)) => Err(LexlinkError::config(
                "a map of fields and their weights is required for MLM",
            )),
            ("prms", None) => Ok(FieldSpec::List(vec![FIELD_CATCHALL.to_string()])),
            ("prms", Some(FieldSpec::List(fields))) if !fields.is_empty() => {
                Ok(FieldSpec::List(fields.clone()))
            }
            ("prms", Some(_)) => Err(LexlinkError::config(
                "a non-empty list of fields is required for PRMS",
            )),
            (other, _) => Err(LexlinkError::config(format!("unknown model \"{other}\""))),
        }
    }

    /// Check the model, fields and smoothing settings.
    pub fn validate(&self) -> Result<()> {
        self.smoothing()?;
        self.field_spec()?;
        Ok(())
    }
}

fn default_first_pass_num_docs() -> usize {
    1000
}

fn default_field() -> String {
    FIELD_CATCHALL.to_string()
}

/// First-pass (BM25) retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirstPassConfig {
    #[serde(default = "default_first_pass_num_docs")]
    pub num_docs: usize,
    #[serde(default = "default_field")]
    pub field: String,
    /// Comma-separated stored fields returned with each hit.
    #[serde(default)]
    pub fields_return: String,
}

impl Default for FirstPassConfig {
    fn default() -> Self {
        FirstPassConfig {
            num_docs: default_first_pass_num_docs(),
            field: default_field(),
            fields_return: String::new(),
        }
    }
}

impl FirstPassConfig {
    pub fn fields_return(&self) -> Vec<String> {
        self.fields_return
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn default_num_docs() -> usize {
    100
}

fn default_threads() -> usize {
    1
}

fn default_elr_lambdas() -> [f64; 2] {
    [0.9, 0.1]
}

fn default_uri_fields() -> Vec<String> {
    vec![FIELD_CATCHALL.to_string()]
}

/// Entity-linking-based retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElrConfig {
    /// `[λ_T, λ_E]`
    #[serde(default = "default_elr_lambdas")]
    pub lambdas: [f64; 2],
    /// Fields of the URI index read by `p(e|d)`.
    #[serde(default = "default_uri_fields")]
    pub uri_fields: Vec<String>,
    /// Documents of the URI index (`{doc_id: {field: "uri uri ..."}}`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri_index_file: Option<PathBuf>,
    /// Query annotations (`{qid: {"results": [{entity, score}]}}`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annot_file: Option<PathBuf>,
    #[serde(default = "default_threshold")]
    pub annot_threshold: f64,
    /// Precomputed `p(f|e)` (`{entity: {field: p}}`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_file: Option<PathBuf>,
}

impl Default for ElrConfig {
    fn default() -> Self {
        ElrConfig {
            lambdas: default_elr_lambdas(),
            uri_fields: default_uri_fields(),
            uri_index_file: None,
            annot_file: None,
            annot_threshold: default_threshold(),
            mapping_file: None,
        }
    }
}

impl ElrConfig {
    pub fn lambda_t(&self) -> f64 {
        self.lambdas[0]
    }

    pub fn lambda_e(&self) -> f64 {
        self.lambdas[1]
    }

    pub fn validate(&self) -> Result<()> {
        if self.lambdas.iter().any(|l| !(*l >= 0.0)) {
            return Err(LexlinkError::config(format!(
                "ELR lambdas must be non-negative, got {:?}",
                self.lambdas
            )));
        }
        if self.uri_fields.is_empty() {
            return Err(LexlinkError::config("ELR uri_fields must not be empty"));
        }
        Ok(())
    }
}

/// Two-pass retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub first_pass: FirstPassConfig,
    #[serde(flatten)]
    pub scorer: ScorerConfig,
    #[serde(default = "default_num_docs")]
    pub num_docs: usize,
    #[serde(default)]
    pub start: usize,
    /// Documents to load into the in-memory index (`{doc_id: {field: text}}`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Enables entity-linking-based scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elr: Option<ElrConfig>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        RetrievalConfig {
            first_pass: FirstPassConfig::default(),
            scorer: ScorerConfig::default(),
            num_docs: default_num_docs(),
            start: 0,
            index_file: None,
            query_file: None,
            output_file: None,
            run_id: None,
            threads: default_threads(),
            elr: None,
        }
    }
}

impl RetrievalConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: RetrievalConfig = load_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Whether only the first pass is run.
    pub fn is_first_pass_only(&self) -> bool {
        self.scorer.model.eq_ignore_ascii_case(MODEL_BM25)
    }

    /// Run identifier for TREC output, defaulting to the model name (`elr`
    /// with ELR enabled).
    pub fn run_id(&self) -> &str {
        match (&self.run_id, &self.elr) {
            (Some(run_id), _) => run_id.as_str(),
            (None, Some(_)) => "elr",
            (None, None) => &self.scorer.model,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.is_first_pass_only() {
            self.scorer.validate()?;
        }
        if let Some(elr) = &self.elr {
            if self.is_first_pass_only() {
                return Err(LexlinkError::config(
                    "ELR needs a second-pass model (lm, mlm or prms)",
                ));
            }
            elr.validate()?;
        }
        if self.first_pass.num_docs == 0 {
            return Err(LexlinkError::config("first_pass.num_docs must be positive"));
        }
        if self.threads == 0 {
            return Err(LexlinkError::config("threads must be at least 1"));
        }
        Ok(())
    }
}

/// Entity linking method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkingMethod {
    /// Most common entity per mention.
    Cmns,
    /// Learning-to-rank followed by greedy disambiguation.
    Ltr,
}

/// Stage of the linking pipeline to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkingStep {
    #[default]
    Linking,
    Ranking,
    Disambiguation,
}

fn default_method() -> LinkingMethod {
    LinkingMethod::Ltr
}

fn default_threshold() -> f64 {
    0.1
}

fn default_sf_sources() -> Vec<String> {
    vec!["facc12".to_string()]
}

/// Entity linking settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkingConfig {
    #[serde(default = "default_method")]
    pub method: LinkingMethod,
    /// Final score threshold (commonness for CMNS, ranker score for LTR).
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Commonness threshold applied during candidate generation.
    #[serde(default = "default_threshold")]
    pub cmns_threshold: f64,
    #[serde(default)]
    pub step: LinkingStep,
    /// Proper-name entity ids, one per line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kb_snapshot: Option<PathBuf>,
    /// Tree-ensemble ranker (LTR only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_file: Option<PathBuf>,
    /// Expected task of the ranker; checked against the artifact when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    /// Where ranked instances or linking results are additionally written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_file: Option<PathBuf>,
    /// Pre-scored instances for the disambiguation step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_set: Option<PathBuf>,
    /// Surface-form sources counted by commonness.
    #[serde(default = "default_sf_sources")]
    pub sf_sources: Vec<String>,
    /// Field used by the `lm_score` and `context_sim` features.
    #[serde(default = "default_field")]
    pub similarity_field: String,
    /// Field weights enabling the `mlm_score` feature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mlm_fields: Option<BTreeMap<String, f64>>,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        LinkingConfig {
            method: default_method(),
            threshold: default_threshold(),
            cmns_threshold: default_threshold(),
            step: LinkingStep::default(),
            kb_snapshot: None,
            model_file: None,
            category: None,
            index_file: None,
            query_file: None,
            output_file: None,
            json_file: None,
            test_set: None,
            sf_sources: default_sf_sources(),
            similarity_field: default_field(),
            mlm_fields: None,
        }
    }
}

impl LinkingConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: LinkingConfig = load_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.cmns_threshold) {
            return Err(LexlinkError::config(format!(
                "cmns_threshold must lie in [0, 1], got {}",
                self.cmns_threshold
            )));
        }
        if self.sf_sources.is_empty() {
            return Err(LexlinkError::config("sf_sources must not be empty"));
        }
        if self.method == LinkingMethod::Ltr && self.model_file.is_none() {
            return Err(LexlinkError::config("model_file is required for LTR linking"));
        }
        if self.step == LinkingStep::Disambiguation && self.test_set.is_none() {
            return Err(LexlinkError::config(
                "test_set is required for the disambiguation step",
            ));
        }
        if let Some(weights) = &self.mlm_fields {
            ScorerConfig::mlm(weights.clone()).validate()?;
        }
        Ok(())
    }
}

/// Target type identification method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtiMethod {
    /// Types are retrieved as documents.
    #[default]
    Tc,
    /// Types are scored through the entities retrieved for the query.
    Ec,
}

/// Retrieval model of target type identification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtiModel {
    Lm,
    #[default]
    Bm25,
}

/// Document-object weighting of late fusion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssocMode {
    #[default]
    Binary,
    Uniform,
}

fn default_tti_num_docs() -> usize {
    10
}

fn default_ec_cutoff() -> usize {
    20
}

fn default_tti_first_pass_num_docs() -> usize {
    50
}

fn default_tti_run_id() -> String {
    "tti".to_string()
}

/// Target type identification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtiConfig {
    #[serde(default)]
    pub method: TtiMethod,
    #[serde(default)]
    pub model: TtiModel,
    #[serde(default = "default_tti_num_docs")]
    pub num_docs: usize,
    #[serde(default)]
    pub start: usize,
    /// Entities fused per query (EC).
    #[serde(default = "default_ec_cutoff")]
    pub ec_cutoff: usize,
    #[serde(default = "default_tti_first_pass_num_docs")]
    pub first_pass_num_docs: usize,
    /// Retrieval field; `content` for TC and `catchall` for EC when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default = "default_smoothing_method")]
    pub smoothing_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing_param: Option<SmoothingParam>,
    #[serde(default)]
    pub assoc_mode: AssocMode,
    /// Type documents (TC) or entity documents (EC) for the in-memory index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trec_output_file: Option<PathBuf>,
    #[serde(default = "default_tti_run_id")]
    pub run_id: String,
}

impl Default for TtiConfig {
    fn default() -> Self {
        TtiConfig {
            method: TtiMethod::default(),
            model: TtiModel::default(),
            num_docs: default_tti_num_docs(),
            start: 0,
            ec_cutoff: default_ec_cutoff(),
            first_pass_num_docs: default_tti_first_pass_num_docs(),
            field: None,
            smoothing_method: default_smoothing_method(),
            smoothing_param: None,
            assoc_mode: AssocMode::default(),
            index_file: None,
            query_file: None,
            output_file: None,
            trec_output_file: None,
            run_id: default_tti_run_id(),
        }
    }
}

impl TtiConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: TtiConfig = load_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// The retrieval field with the per-method default applied.
    pub fn field(&self) -> &str {
        match (&self.field, self.method) {
            (Some(field), _) => field.as_str(),
            (None, TtiMethod::Tc) => "content",
            (None, TtiMethod::Ec) => FIELD_CATCHALL,
        }
    }

    /// Retrieval settings for the configured model and field.
    pub fn retrieval_config(&self) -> RetrievalConfig {
        let model = match self.model {
            TtiModel::Lm => "lm",
            TtiModel::Bm25 => MODEL_BM25,
        };
        let num_docs = match self.method {
            TtiMethod::Tc => self.first_pass_num_docs,
            TtiMethod::Ec => self.ec_cutoff,
        };
        RetrievalConfig {
            first_pass: FirstPassConfig {
                num_docs: self.first_pass_num_docs.max(num_docs),
                field: self.field().to_string(),
                fields_return: String::new(),
            },
            scorer: ScorerConfig {
                model: model.to_string(),
                fields: Some(FieldSpec::Single(self.field().to_string())),
                smoothing_method: self.smoothing_method.clone(),
                smoothing_param: self.smoothing_param,
            },
            num_docs,
            run_id: Some(self.run_id.clone()),
            ..RetrievalConfig::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_docs == 0 {
            return Err(LexlinkError::config("num_docs must be positive"));
        }
        if self.method == TtiMethod::Ec && self.ec_cutoff == 0 {
            return Err(LexlinkError::config("ec_cutoff must be positive"));
        }
        self.retrieval_config().validate()
    }
}
