//! Memoizing façade over a [`TextSearchService`].
//!
//! Every statistic is fetched from the service at most once per cache
//! lifetime. The cache grows monotonically; long-running callers should
//! [`StatsCache::clear`] it or create a fresh one per task.

use ahash::AHashMap;
use log::debug;

use crate::error::Result;
use crate::stats::service::{FieldStats, TermStats, TermVector, TextSearchService};

/// Number of documents fetched per batched term-vector request.
pub const PREFETCH_BATCH_SIZE: usize = 50;

/// Per-task statistics cache.
#[derive(Debug)]
pub struct StatsCache<'a> {
    service: &'a dyn TextSearchService,
    field_stats: AHashMap<String, FieldStats>,
    term_vectors: AHashMap<(String, String), TermVector>,
    doc_lengths: AHashMap<(String, String), u64>,
    term_stats: AHashMap<(String, String), TermStats>,
    fetches: usize,
}

impl<'a> StatsCache<'a> {
    pub fn new(service: &'a dyn TextSearchService) -> Self {
        StatsCache {
            service,
            field_stats: AHashMap::new(),
            term_vectors: AHashMap::new(),
            doc_lengths: AHashMap::new(),
            term_stats: AHashMap::new(),
            fetches: 0,
        }
    }

    /// The wrapped service.
    pub fn service(&self) -> &'a dyn TextSearchService {
        self.service
    }

    /// Number of calls made to the service so far.
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    fn field_stats(&mut self, field: &str) -> Result<FieldStats> {
        if let Some(stats) = self.field_stats.get(field) {
            return Ok(*stats);
        }
        self.fetches += 1;
        let stats = self.service.field_stats(field)?;
        self.field_stats.insert(field.to_string(), stats);
        Ok(stats)
    }

    /// Number of documents having the field.
    pub fn doc_count(&mut self, field: &str) -> Result<u64> {
        Ok(self.field_stats(field)?.doc_count)
    }

    /// Total number of terms in the field across the collection.
    pub fn coll_length(&mut self, field: &str) -> Result<u64> {
        Ok(self.field_stats(field)?.sum_total_term_freq)
    }

    /// Average field length; 0 when no document has the field.
    pub fn avg_len(&mut self, field: &str) -> Result<f64> {
        let stats = self.field_stats(field)?;
        if stats.doc_count == 0 {
            return Ok(0.0);
        }
        Ok(stats.sum_total_term_freq as f64 / stats.doc_count as f64)
    }

    /// Term vector of a document field (empty when absent).
    pub fn term_freqs(&mut self, doc_id: &str, field: &str) -> Result<&TermVector> {
        let key = (doc_id.to_string(), field.to_string());
        if !self.term_vectors.contains_key(&key) {
            self.fetches += 1;
            let vector = self.service.term_vector(doc_id, field)?;
            self.term_vectors.insert(key.clone(), vector);
        }
        Ok(&self.term_vectors[&key])
    }

    /// Frequency of a term in a document field.
    pub fn term_freq(&mut self, doc_id: &str, field: &str, term: &str) -> Result<u64> {
        Ok(*self.term_freqs(doc_id, field)?.get(term).unwrap_or(&0))
    }

    /// Length of a document field, i.e. the sum of its term frequencies.
    pub fn doc_length(&mut self, doc_id: &str, field: &str) -> Result<u64> {
        let key = (doc_id.to_string(), field.to_string());
        if let Some(length) = self.doc_lengths.get(&key) {
            return Ok(*length);
        }
        let length = self.term_freqs(doc_id, field)?.values().sum();
        self.doc_lengths.insert(key, length);
        Ok(length)
    }

    fn term_stats(&mut self, term: &str, field: &str) -> Result<TermStats> {
        let key = (field.to_string(), term.to_string());
        if let Some(stats) = self.term_stats.get(&key) {
            return Ok(*stats);
        }
        self.fetches += 1;
        let stats = self.service.term_stats(term, field)?;
        self.term_stats.insert(key, stats);
        Ok(stats)
    }

    /// Number of documents containing the term in the field.
    pub fn doc_freq(&mut self, term: &str, field: &str) -> Result<u64> {
        Ok(self.term_stats(term, field)?.doc_freq)
    }

    /// Total occurrences of the term in the field across the collection.
    pub fn coll_term_freq(&mut self, term: &str, field: &str) -> Result<u64> {
        Ok(self.term_stats(term, field)?.total_term_freq)
    }

    /// Fetch term vectors of many documents in batches of
    /// [`PREFETCH_BATCH_SIZE`], skipping documents already cached.
    ///
    /// Empty vectors are not cached, so a later single-document lookup can
    /// still retry them.
    pub fn prefetch_term_vectors(&mut self, doc_ids: &[String], field: &str) -> Result<()> {
        let missing: Vec<String> = doc_ids
            .iter()
            .filter(|id| {
                !self
                    .term_vectors
                    .contains_key(&((*id).clone(), field.to_string()))
            })
            .cloned()
            .collect();

        for batch in missing.chunks(PREFETCH_BATCH_SIZE) {
            self.fetches += 1;
            let vectors = self.service.multi_term_vectors(batch, field)?;
            debug!(
                "Prefetched {} term vectors for field {} ({} requested)",
                vectors.len(),
                field,
                batch.len()
            );
            for (doc_id, vector) in vectors {
                if !vector.is_empty() {
                    self.term_vectors.insert((doc_id, field.to_string()), vector);
                }
            }
        }
        Ok(())
    }

    /// Discard every memoized value.
    pub fn clear(&mut self) {
        self.field_stats.clear();
        self.term_vectors.clear();
        self.doc_lengths.clear();
        self.term_stats.clear();
    }
}
