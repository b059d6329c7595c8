//! Accessors over DBpedia-style entity documents.

use serde_json::Value;

use crate::catalog::store::Document;

pub const PREDICATE_NAME: &str = "<rdfs:label>";
pub const PREDICATE_SHORT_ABSTRACT: &str = "<rdfs:comment>";
pub const PREDICATE_ABSTRACT: &str = "<dbo:abstract>";
pub const PREDICATE_REDIRECT: &str = "<dbo:wikiPageRedirects>";
pub const PREDICATE_INVERSE_REDIRECT: &str = "!<dbo:wikiPageRedirects>";
pub const PREDICATE_DISAMBIGUATES: &str = "<dbo:wikiPageDisambiguates>";
pub const PREDICATE_WIKILINK: &str = "<dbo:wikiPageWikiLink>";
pub const PREDICATE_SAME_AS: &str = "<owl:sameAs>";
pub const PREDICATE_INVERSE_SAME_AS: &str = "!<owl:sameAs>";

/// An entity id together with its (unescaped) document.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDocument {
    id: String,
    doc: Document,
}

impl EntityDocument {
    pub fn new<S: Into<String>>(id: S, doc: Document) -> Self {
        EntityDocument { id: id.into(), doc }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn has_predicate(&self, predicate: &str) -> bool {
        self.doc.contains_key(predicate)
    }

    /// String values of a predicate; a scalar string counts as one value.
    pub fn values(&self, predicate: &str) -> Vec<&str> {
        match self.doc.get(predicate) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(s)) => vec![s.as_str()],
            _ => Vec::new(),
        }
    }

    /// First value of a predicate.
    pub fn first_value(&self, predicate: &str) -> Option<&str> {
        self.values(predicate).into_iter().next()
    }

    pub fn name(&self) -> Option<&str> {
        self.first_value(PREDICATE_NAME)
    }

    pub fn short_abstract(&self) -> Option<&str> {
        self.first_value(PREDICATE_SHORT_ABSTRACT)
    }

    pub fn abstract_text(&self) -> Option<&str> {
        self.first_value(PREDICATE_ABSTRACT)
    }

    /// Number of distinct outgoing wiki links.
    pub fn outlinks(&self) -> usize {
        self.distinct_count(PREDICATE_WIKILINK)
    }

    /// Number of distinct redirect pages pointing to the entity.
    pub fn redirects(&self) -> usize {
        self.distinct_count(PREDICATE_INVERSE_REDIRECT)
    }

    fn distinct_count(&self, predicate: &str) -> usize {
        let mut values = self.values(predicate);
        values.sort_unstable();
        values.dedup();
        values.len()
    }

    pub fn is_redirect(&self) -> bool {
        self.has_predicate(PREDICATE_REDIRECT)
    }

    pub fn is_disambiguation(&self) -> bool {
        self.id.ends_with("_(disambiguation)>") || self.has_predicate(PREDICATE_DISAMBIGUATES)
    }

    /// A proper entity has a name and an abstract and is neither a redirect
    /// nor a disambiguation page.
    pub fn is_entity(&self) -> bool {
        self.has_predicate(PREDICATE_NAME)
            && self.has_predicate(PREDICATE_ABSTRACT)
            && !self.is_redirect()
            && !self.is_disambiguation()
    }
}
