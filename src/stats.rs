//! Term statistics: the text-search collaborator and its memoizing cache.
//!
//! [`TextSearchService`] is the pull-only interface to the external index.
//! [`MemoryIndex`] implements it over in-memory documents, and
//! [`StatsCache`] memoizes every statistic a scoring session asks for.

pub mod cache;
pub mod memory;
pub mod service;

pub use cache::StatsCache;
pub use memory::MemoryIndex;
pub use service::{FIELD_CATCHALL, FieldStats, SearchHit, TermStats, TermVector, TextSearchService};
