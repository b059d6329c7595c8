//! Entity catalog: entity facts, surface-form tables and id mappings.
//!
//! [`EntityCatalog`] is a thin façade over three [`DocumentStore`]s:
//!
//! - entities, keyed by prefixed DBpedia ids (`<dbpedia:Honolulu>`),
//! - surface forms, keyed by lower-cased names, each holding
//!   `{source: {entity_id: count}}`,
//! - an optional Freebase → DBpedia id map (`!<owl:sameAs>`). Without it,
//!   surface-form entity ids are used as they are.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use lexlink::catalog::{EntityCatalog, MemoryStore};
//!
//! let surface_forms = MemoryStore::from_json_str(
//!     r#"{"honolulu": {"facc12": {"<dbpedia:Honolulu>": 10}}}"#,
//! ).unwrap();
//! let catalog = EntityCatalog::new(Arc::new(MemoryStore::new()), Arc::new(surface_forms));
//!
//! let matches = catalog.lookup_surface_form("honolulu").unwrap();
//! assert_eq!(matches["facc12"]["<dbpedia:Honolulu>"], 10.0);
//! ```

pub mod entity;
pub mod memory;
pub mod snapshot;
pub mod store;

use std::collections::BTreeMap;
use std::sync::Arc;

use log::warn;
use serde_json::Value;

use crate::error::Result;

pub use entity::EntityDocument;
pub use memory::MemoryStore;
pub use snapshot::KbSnapshot;
pub use store::{Document, DocumentStore};

use entity::{PREDICATE_INVERSE_SAME_AS, PREDICATE_SAME_AS};

/// Surface-form matches: `{source: {entity_id: count}}`.
pub type SurfaceFormMatches = BTreeMap<String, BTreeMap<String, f64>>;

const FREEBASE_PREFIX: &str = "<fb:";

#[derive(Debug, Clone)]
pub struct EntityCatalog {
    entities: Arc<dyn DocumentStore>,
    surface_forms: Arc<dyn DocumentStore>,
    id_map: Option<Arc<dyn DocumentStore>>,
}

impl EntityCatalog {
    pub fn new(entities: Arc<dyn DocumentStore>, surface_forms: Arc<dyn DocumentStore>) -> Self {
        EntityCatalog {
            entities,
            surface_forms,
            id_map: None,
        }
    }

    /// Map surface-form entity ids through a Freebase → DBpedia store.
    pub fn with_id_map(mut self, id_map: Arc<dyn DocumentStore>) -> Self {
        self.id_map = Some(id_map);
        self
    }

    pub fn has_id_map(&self) -> bool {
        self.id_map.is_some()
    }

    /// Look up an entity document.
    pub fn lookup_entity(&self, id: &str) -> Result<Option<EntityDocument>> {
        Ok(self
            .entities
            .find_by_id(id)?
            .map(|doc| EntityDocument::new(id, doc)))
    }

    /// Candidate entities of a name, per source. Empty when the name is
    /// unknown; non-numeric counts are skipped.
    pub fn lookup_surface_form(&self, name: &str) -> Result<SurfaceFormMatches> {
        let Some(doc) = self.surface_forms.find_by_id(name)? else {
            return Ok(SurfaceFormMatches::new());
        };

        let mut matches = SurfaceFormMatches::new();
        for (source, value) in doc {
            let Value::Object(counts) = value else {
                continue;
            };
            let mut entities = BTreeMap::new();
            for (entity, count) in counts {
                match count.as_f64() {
                    Some(c) => {
                        entities.insert(entity, c);
                    }
                    None => warn!("Skipping non-numeric count for \"{name}\" -> {entity}"),
                }
            }
            matches.insert(source, entities);
        }
        Ok(matches)
    }

    /// DBpedia ids of a Freebase id; `None` when the id has no mapping.
    pub fn map_id(&self, fb_id: &str) -> Result<Option<Vec<String>>> {
        let Some(id_map) = &self.id_map else {
            return Ok(Some(vec![fb_id.to_string()]));
        };
        Ok(id_map.find_by_id(fb_id)?.map(|doc| {
            EntityDocument::new(fb_id, doc)
                .values(PREDICATE_INVERSE_SAME_AS)
                .into_iter()
                .map(str::to_string)
                .collect()
        }))
    }

    /// Freebase ids of a DBpedia entity, read from its `<owl:sameAs>` links.
    pub fn reverse_map_id(&self, dbp_id: &str) -> Result<Option<Vec<String>>> {
        if self.id_map.is_none() {
            return Ok(Some(vec![dbp_id.to_string()]));
        }
        Ok(self
            .lookup_entity(dbp_id)?
            .and_then(|entity| self.reverse_map_document(&entity)))
    }

    /// [`Self::reverse_map_id`] over an already fetched entity document.
    pub fn reverse_map_document(&self, entity: &EntityDocument) -> Option<Vec<String>> {
        if self.id_map.is_none() {
            return Some(vec![entity.id().to_string()]);
        }
        let fb_ids: Vec<String> = entity
            .values(PREDICATE_SAME_AS)
            .into_iter()
            .filter(|v| v.starts_with(FREEBASE_PREFIX))
            .map(str::to_string)
            .collect();
        if fb_ids.is_empty() { None } else { Some(fb_ids) }
    }
}
