//! Document store abstraction and the key-escaping contract.
//!
//! The store reserves `.` and `$` in keys. They are written as `U+002E` and
//! `U+0024` and restored on read. Stored data produced by other tools
//! follows the same convention, so the mapping must not change.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::Result;

/// Field name of the document identifier in the raw store format.
pub const ID_FIELD: &str = "_id";

/// An unescaped document: field name to JSON value.
pub type Document = BTreeMap<String, Value>;

/// A key/value store of JSON documents addressed by id.
///
/// Backend failures surface as [`crate::error::LexlinkError::Collaborator`];
/// an absent id is `Ok(None)`.
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Return the unescaped document stored under `id`.
    fn find_by_id(&self, id: &str) -> Result<Option<Document>>;
}

/// Escape a key for storage.
pub fn escape(s: &str) -> String {
    s.replace('.', "U+002E").replace('$', "U+0024")
}

/// Restore a key read from storage.
pub fn unescape(s: &str) -> String {
    s.replace("U+002E", ".").replace("U+0024", "$")
}

/// Escape the field names of a document and the inner keys of its
/// object-valued fields.
pub fn escape_document(doc: &Document) -> Document {
    doc.iter()
        .map(|(field, value)| (escape(field), map_object_keys(value, escape)))
        .collect()
}

/// Unescape a stored document. List values are kept as they are; object
/// values (surface-form tables) get their inner keys unescaped too.
pub fn unescape_document(doc: &Document) -> Document {
    doc.iter()
        .map(|(field, value)| {
            if field == ID_FIELD {
                let id = value
                    .as_str()
                    .map(|s| Value::String(unescape(s)))
                    .unwrap_or_else(|| value.clone());
                (field.clone(), id)
            } else {
                (unescape(field), map_object_keys(value, unescape))
            }
        })
        .collect()
}

fn map_object_keys(value: &Value, f: fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (f(k), v.clone())).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_roundtrip() {
        assert_eq!(escape("a.b$c"), "aU+002EbU+0024c");
        assert_eq!(unescape("aU+002EbU+0024c"), "a.b$c");
        assert_eq!(unescape(&escape("st. louis")), "st. louis");
    }

    #[test]
    fn test_unescape_document() {
        let mut stored = Document::new();
        stored.insert(ID_FIELD.to_string(), json!("mr U+002E smith"));
        stored.insert(
            "<dbo:wikiPageWikiLink>".to_string(),
            json!(["<dbpedia:StU+002E_Louis>"]),
        );
        stored.insert(
            "facc12".to_string(),
            json!({"<dbpedia:StU+002E_Louis>": 3, "/m/0U+0024x": 1}),
        );

        let doc = unescape_document(&stored);
        assert_eq!(doc[ID_FIELD], json!("mr . smith"));
        // list values are left untouched
        assert_eq!(doc["<dbo:wikiPageWikiLink>"], json!(["<dbpedia:StU+002E_Louis>"]));
        assert_eq!(doc["facc12"], json!({"<dbpedia:St._Louis>": 3, "/m/0$x": 1}));
    }

    #[test]
    fn test_escape_document() {
        let mut doc = Document::new();
        doc.insert("a.b".to_string(), json!({"x.y": 1}));
        doc.insert("c".to_string(), json!(["v.w"]));
        let stored = escape_document(&doc);
        assert_eq!(stored["aU+002Eb"], json!({"xU+002Ey": 1}));
        assert_eq!(stored["c"], json!(["v.w"]));
        assert_eq!(unescape_document(&stored), doc);
    }
}
