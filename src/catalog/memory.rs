//! In-memory document store for tests and local data files.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::catalog::store::{Document, DocumentStore, escape, escape_document, unescape_document};
use crate::error::Result;

/// A document store kept in memory, holding documents in escaped form.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: HashMap<String, Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load unescaped documents from JSON of the form `{id: {field: value}}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let docs: BTreeMap<String, Document> = serde_json::from_str(json)?;
        let mut store = Self::new();
        for (id, doc) in &docs {
            store.insert(id, doc);
        }
        Ok(store)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Insert or replace a document, escaping its id and keys.
    pub fn insert(&mut self, id: &str, doc: &Document) {
        self.documents.insert(escape(id), escape_document(doc));
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.documents.get(&escape(id)).map(unescape_document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_insert_and_find() {
        let mut store = MemoryStore::new();
        let mut doc = Document::new();
        doc.insert("facc12".to_string(), json!({"/m/02mjmr": 50}));
        store.insert("barack obama", &doc);

        assert_eq!(store.len(), 1);
        assert_eq!(store.find_by_id("barack obama").unwrap(), Some(doc));
        assert_eq!(store.find_by_id("michelle obama").unwrap(), None);
    }

    #[test]
    fn test_reserved_characters_in_ids() {
        let store =
            MemoryStore::from_json_str(r#"{"st. louis": {"facc12": {"/m/06wxw": 7}}}"#).unwrap();
        let doc = store.find_by_id("st. louis").unwrap().unwrap();
        assert_eq!(doc["facc12"], json!({"/m/06wxw": 7}));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"<dbpedia:Honolulu>": {{"<rdfs:label>": ["Honolulu"]}}}}"#).unwrap();
        let store = MemoryStore::from_json_file(file.path()).unwrap();
        assert!(!store.is_empty());
        assert!(store.find_by_id("<dbpedia:Honolulu>").unwrap().is_some());
    }
}
