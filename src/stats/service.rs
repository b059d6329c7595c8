//! Interface to the external text-search service.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Name of the field holding the concatenation of all other fields.
pub const FIELD_CATCHALL: &str = "catchall";

/// Term frequencies of one document field: `{term: freq}`.
pub type TermVector = HashMap<String, u64>;

/// A ranked hit returned by the first-pass search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Document identifier.
    pub doc_id: String,
    /// Relevance score assigned by the service.
    pub score: f64,
    /// Stored field values requested with the search.
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

/// Collection-level statistics of a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStats {
    /// Number of documents with at least one term in the field.
    pub doc_count: u64,
    /// Total number of term occurrences in the field across the collection.
    pub sum_total_term_freq: u64,
}

/// Collection-level statistics of a term within a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermStats {
    /// Number of documents containing the term in the field.
    pub doc_freq: u64,
    /// Total occurrences of the term in the field across the collection.
    pub total_term_freq: u64,
}

/// The text-search service that stores field content and serves term-vector
/// statistics.
///
/// Every call is a (potentially remote) blocking operation. Implementations
/// report unreachable backends as [`crate::error::LexlinkError::Collaborator`];
/// absent documents, fields and terms are not errors and yield empty or zero
/// values.
pub trait TextSearchService: Send + Sync + std::fmt::Debug {
    /// Run the index analyzer over a query and return the space-joined terms.
    fn analyze_query(&self, query: &str) -> Result<String>;

    /// Rank documents for the (analyzed) query on a single field.
    fn search(&self, query: &str, field: &str, num: usize, start: usize) -> Result<Vec<SearchHit>>;

    /// Fetch the term vector of a document field (empty when absent).
    fn term_vector(&self, doc_id: &str, field: &str) -> Result<TermVector>;

    /// Fetch term vectors of many documents in one round trip.
    ///
    /// Documents without a vector map to an empty one rather than failing the
    /// whole request.
    fn multi_term_vectors(&self, doc_ids: &[String], field: &str)
    -> Result<HashMap<String, TermVector>>;

    /// Collection-level statistics of a field.
    fn field_stats(&self, field: &str) -> Result<FieldStats>;

    /// Collection-level statistics of a term in a field.
    fn term_stats(&self, term: &str, field: &str) -> Result<TermStats>;
}
