//! Ranked result lists and the TREC run format.
//!
//! One line per ranked document: `qid\tQ0\tdoc_id\trank\tscore\trun_id`,
//! ranks starting at 1.

use std::collections::HashMap;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// A scored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub doc_id: String,
    pub score: f64,
    /// Stored fields returned by the first pass.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, String>,
}

/// Retrieval scores of one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredResults")]
pub struct RetrievalResults {
    docs: Vec<ScoredDoc>,
    /// Position of each document in `docs`.
    #[serde(skip)]
    positions: AHashMap<String, usize>,
}

#[derive(Deserialize)]
struct StoredResults {
    docs: Vec<ScoredDoc>,
}

impl From<StoredResults> for RetrievalResults {
    fn from(stored: StoredResults) -> Self {
        let mut results = RetrievalResults::new();
        for doc in stored.docs {
            results.push(doc);
        }
        results
    }
}

impl RetrievalResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document, replacing an earlier score of the same document.
    pub fn append<S: Into<String>>(&mut self, doc_id: S, score: f64) {
        self.push(ScoredDoc {
            doc_id: doc_id.into(),
            score,
            fields: HashMap::new(),
        });
    }

    pub fn push(&mut self, doc: ScoredDoc) {
        match self.positions.get(&doc.doc_id) {
            Some(&i) => self.docs[i] = doc,
            None => {
                self.positions.insert(doc.doc_id.clone(), self.docs.len());
                self.docs.push(doc);
            }
        }
    }

    pub fn num_docs(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn score(&self, doc_id: &str) -> Option<f64> {
        self.positions.get(doc_id).map(|&i| self.docs[i].score)
    }

    /// Documents by descending score; ties by document id.
    pub fn sorted(&self) -> Vec<&ScoredDoc> {
        let mut docs: Vec<&ScoredDoc> = self.docs.iter().collect();
        docs.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        docs
    }

    /// TREC lines of at most `max_rank` documents.
    pub fn to_trec(&self, qid: &str, run_id: &str, max_rank: usize) -> String {
        let mut out = String::new();
        for (i, doc) in self.sorted().into_iter().take(max_rank).enumerate() {
            out.push_str(&trec_line(qid, &doc.doc_id, i + 1, doc.score, run_id));
        }
        out
    }
}

impl FromIterator<(String, f64)> for RetrievalResults {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut results = RetrievalResults::new();
        for (doc_id, score) in iter {
            results.append(doc_id, score);
        }
        results
    }
}

pub fn trec_line(qid: &str, doc_id: &str, rank: usize, score: f64, run_id: &str) -> String {
    format!("{qid}\tQ0\t{doc_id}\t{rank}\t{score}\t{run_id}\n")
}
