//! Document retrieval with language-model re-ranking.
//!
//! A first pass asks the text-search service for the top documents of the
//! analyzed query on one field (BM25). Unless the configured model is
//! `bm25`, those hits are re-scored with the LM, MLM or PRMS scorer and
//! documents the scorer cannot score are dropped. Batch runs write TREC run
//! files.
//!
//! With an `elr` section and [`ElrResources`] attached, the second pass
//! also weighs the entities annotated in each query. [`LateFusion`] turns a
//! document ranking into a ranking of associated objects.
//!
//! # Examples
//!
//! ```
//! use lexlink::config::{RetrievalConfig, ScorerConfig};
//! use lexlink::retrieval::Retrieval;
//! use lexlink::stats::MemoryIndex;
//!
//! let mut index = MemoryIndex::new();
//! index.add_document("d1", [("title", "Honolulu"), ("body", "capital of Hawaii")]);
//! index.add_document("d2", [("title", "Paris"), ("body", "capital of France")]);
//!
//! let config = RetrievalConfig {
//!     scorer: ScorerConfig::lm("body"),
//!     ..RetrievalConfig::default()
//! };
//! let retrieval = Retrieval::new(config, &index).unwrap();
//! let results = retrieval.retrieve("hawaii").unwrap();
//! assert_eq!(results.sorted()[0].doc_id, "d1");
//! ```

pub mod engine;
pub mod fusion;
pub mod trec;

pub use engine::{ElrResources, Retrieval, load_queries};
pub use fusion::LateFusion;
pub use trec::{RetrievalResults, ScoredDoc};
