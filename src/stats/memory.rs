//! In-memory text-search service.
//!
//! [`MemoryIndex`] analyzes documents at insertion time and keeps per-field
//! term vectors together with the collection statistics derived from them.
//! Every document is additionally indexed under [`FIELD_CATCHALL`], the
//! concatenation of all its fields. First-pass search ranks documents with
//! BM25.
//!
//! # Examples
//!
//! ```
//! use lexlink::stats::{MemoryIndex, TextSearchService};
//!
//! let mut index = MemoryIndex::new();
//! index.add_document("d1", [("title", "Barack Obama"), ("body", "born in Honolulu")]);
//! index.add_document("d2", [("title", "Honolulu"), ("body", "capital of Hawaii")]);
//!
//! let hits = index.search("honolulu", "body", 10, 0).unwrap();
//! assert_eq!(hits[0].doc_id, "d1");
//! assert_eq!(index.field_stats("title").unwrap().doc_count, 2);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use ahash::AHashMap;

use crate::analysis::Analyzer;
use crate::error::Result;
use crate::stats::service::{
    FIELD_CATCHALL, FieldStats, SearchHit, TermStats, TermVector, TextSearchService,
};

/// BM25 k1 parameter (term frequency saturation).
const BM25_K1: f64 = 1.2;
/// BM25 b parameter (field length normalization).
const BM25_B: f64 = 0.75;

/// Stored document: raw field text and analyzed term vectors.
#[derive(Debug, Clone, Default)]
struct StoredDocument {
    fields: HashMap<String, String>,
    vectors: AHashMap<String, TermVector>,
}

/// An in-memory index serving term statistics.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    analyzer: Analyzer,
    documents: AHashMap<String, StoredDocument>,
    field_stats: AHashMap<String, FieldStats>,
    term_stats: AHashMap<String, AHashMap<String, TermStats>>,
}

impl MemoryIndex {
    /// Create an empty index using the default analyzer.
    pub fn new() -> Self {
        Self::with_analyzer(Analyzer::new())
    }

    /// Create an empty index with a custom analyzer.
    pub fn with_analyzer(analyzer: Analyzer) -> Self {
        MemoryIndex {
            analyzer,
            ..Default::default()
        }
    }

    /// Load documents from JSON of the form `{doc_id: {field: text}}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_json_str_with_analyzer(json, Analyzer::new())
    }

    /// [`MemoryIndex::from_json_str`] with a custom analyzer.
    pub fn from_json_str_with_analyzer(json: &str, analyzer: Analyzer) -> Result<Self> {
        let docs: BTreeMap<String, BTreeMap<String, String>> = serde_json::from_str(json)?;
        let mut index = Self::with_analyzer(analyzer);
        for (doc_id, fields) in docs {
            index.add_document(&doc_id, fields.iter().map(|(f, t)| (f.as_str(), t.as_str())));
        }
        Ok(index)
    }

    /// Load documents from a JSON file (see [`MemoryIndex::from_json_str`]).
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_file_with_analyzer(path, Analyzer::new())
    }

    pub fn from_json_file_with_analyzer<P: AsRef<Path>>(
        path: P,
        analyzer: Analyzer,
    ) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str_with_analyzer(&content, analyzer)
    }

    /// Add (or replace) a document.
    pub fn add_document<'t, I>(&mut self, doc_id: &str, fields: I)
    where
        I: IntoIterator<Item = (&'t str, &'t str)>,
    {
        if self.documents.contains_key(doc_id) {
            self.remove_document(doc_id);
        }

        let mut stored = StoredDocument::default();
        let mut catchall = Vec::new();
        for (field, text) in fields {
            stored.fields.insert(field.to_string(), text.to_string());
            let vector = self.term_vector_of(text);
            if field != FIELD_CATCHALL {
                catchall.push(text.to_string());
            }
            stored.vectors.insert(field.to_string(), vector);
        }
        if !stored.vectors.contains_key(FIELD_CATCHALL) {
            let vector = self.term_vector_of(&catchall.join(" "));
            stored.vectors.insert(FIELD_CATCHALL.to_string(), vector);
        }

        for (field, vector) in &stored.vectors {
            self.update_stats(field, vector, true);
        }
        self.documents.insert(doc_id.to_string(), stored);
    }

    /// Remove a document and its contribution to the collection statistics.
    pub fn remove_document(&mut self, doc_id: &str) -> bool {
        match self.documents.remove(doc_id) {
            Some(stored) => {
                for (field, vector) in &stored.vectors {
                    self.update_stats(field, vector, false);
                }
                true
            }
            None => false,
        }
    }

    /// Number of documents in the index.
    pub fn num_docs(&self) -> usize {
        self.documents.len()
    }

    /// Names of all indexed fields, sorted.
    pub fn fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self.field_stats.keys().cloned().collect();
        fields.sort();
        fields
    }

    fn term_vector_of(&self, text: &str) -> TermVector {
        let mut vector = TermVector::new();
        for term in self.analyzer.tokenize(text) {
            *vector.entry(term).or_insert(0) += 1;
        }
        vector
    }

    fn update_stats(&mut self, field: &str, vector: &TermVector, add: bool) {
        let length: u64 = vector.values().sum();
        if length == 0 {
            return;
        }

        let stats = self.field_stats.entry(field.to_string()).or_default();
        let terms = self.term_stats.entry(field.to_string()).or_default();
        if add {
            stats.doc_count += 1;
            stats.sum_total_term_freq += length;
        } else {
            stats.doc_count = stats.doc_count.saturating_sub(1);
            stats.sum_total_term_freq = stats.sum_total_term_freq.saturating_sub(length);
        }

        for (term, &freq) in vector {
            let term_stats = terms.entry(term.clone()).or_default();
            if add {
                term_stats.doc_freq += 1;
                term_stats.total_term_freq += freq;
            } else {
                term_stats.doc_freq = term_stats.doc_freq.saturating_sub(1);
                term_stats.total_term_freq = term_stats.total_term_freq.saturating_sub(freq);
            }
        }
    }

    /// BM25 score of a document field for the given terms.
    fn bm25(&self, terms: &[String], vector: &TermVector, field: &str) -> f64 {
        let stats = self.field_stats.get(field).copied().unwrap_or_default();
        if stats.doc_count == 0 {
            return 0.0;
        }
        let avg_len = stats.sum_total_term_freq as f64 / stats.doc_count as f64;
        let doc_len = vector.values().sum::<u64>() as f64;
        let n = stats.doc_count as f64;

        let mut score = 0.0;
        for term in terms {
            let tf = *vector.get(term).unwrap_or(&0) as f64;
            if tf == 0.0 {
                continue;
            }
            let df = self
                .term_stats
                .get(field)
                .and_then(|t| t.get(term))
                .map(|s| s.doc_freq)
                .unwrap_or(0) as f64;
            // Smoothed IDF stays positive for terms present in most documents.
            let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
            let norm = 1.0 - BM25_B + BM25_B * (doc_len / avg_len);
            score += idf * (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1 * norm);
        }
        score
    }
}

impl TextSearchService for MemoryIndex {
    fn analyze_query(&self, query: &str) -> Result<String> {
        Ok(self.analyzer.analyze(query))
    }

    fn search(&self, query: &str, field: &str, num: usize, start: usize) -> Result<Vec<SearchHit>> {
        let terms = self.analyzer.tokenize(query);
        let mut hits: Vec<SearchHit> = self
            .documents
            .iter()
            .filter_map(|(doc_id, stored)| {
                let vector = stored.vectors.get(field)?;
                if !terms.iter().any(|t| vector.contains_key(t)) {
                    return None;
                }
                Some(SearchHit {
                    doc_id: doc_id.clone(),
                    score: self.bm25(&terms, vector, field),
                    fields: stored.fields.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        Ok(hits.into_iter().skip(start).take(num).collect())
    }

    fn term_vector(&self, doc_id: &str, field: &str) -> Result<TermVector> {
        Ok(self
            .documents
            .get(doc_id)
            .and_then(|d| d.vectors.get(field))
            .cloned()
            .unwrap_or_default())
    }

    fn multi_term_vectors(
        &self,
        doc_ids: &[String],
        field: &str,
    ) -> Result<HashMap<String, TermVector>> {
        doc_ids
            .iter()
            .map(|doc_id| Ok((doc_id.clone(), self.term_vector(doc_id, field)?)))
            .collect()
    }

    fn field_stats(&self, field: &str) -> Result<FieldStats> {
        Ok(self.field_stats.get(field).copied().unwrap_or_default())
    }

    fn term_stats(&self, term: &str, field: &str) -> Result<TermStats> {
        Ok(self
            .term_stats
            .get(field)
            .and_then(|t| t.get(term))
            .copied()
            .unwrap_or_default())
    }
}
