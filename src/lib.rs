//! # lexlink
//!
//! Field-aware language-model retrieval and entity linking for search
//! queries.
//!
//! ## Features
//!
//! - Query-likelihood scoring with Jelinek-Mercer or Dirichlet smoothing
//! - Mixture of language models (MLM) and probabilistic field mapping (PRMS)
//! - Two-pass retrieval with TREC run output
//! - Commonness-based mention and candidate generation
//! - Learning-to-rank entity linking with tree-ensemble rankers
//! - Greedy construction of non-overlapping interpretation sets
//! - Entity-linking-based retrieval (ELR) from query annotations
//! - Target type identification with late fusion of entity scores
//!
//! Statistics come from a [`stats::TextSearchService`] and entity facts
//! from a [`catalog::DocumentStore`]; in-memory implementations of both are
//! included.

pub mod analysis;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod linking;
pub mod ml;
pub mod query;
pub mod retrieval;
pub mod scoring;
pub mod stats;
pub mod tti;

pub mod prelude {
    pub use crate::catalog::{EntityCatalog, MemoryStore};
    pub use crate::config::{LinkingConfig, RetrievalConfig, ScorerConfig, TtiConfig};
    pub use crate::error::{LexlinkError, Result};
    pub use crate::linking::{EntityLinker, LinkedEntity};
    pub use crate::query::Query;
    pub use crate::retrieval::Retrieval;
    pub use crate::scoring::{DocumentScorer, Scorer};
    pub use crate::stats::{MemoryIndex, StatsCache, TextSearchService};
    pub use crate::tti::TargetTypeIdentifier;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
