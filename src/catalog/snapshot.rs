//! Knowledge-base snapshot of proper-name entities.

use std::collections::HashSet;
use std::path::Path;

use log::info;

use crate::error::Result;

/// Read-only set of entity ids considered proper-name entities.
///
/// An unloaded snapshot accepts every entity.
#[derive(Debug, Clone, Default)]
pub struct KbSnapshot {
    entities: Option<HashSet<String>>,
}

impl KbSnapshot {
    /// A snapshot that accepts every entity.
    pub fn unloaded() -> Self {
        Self::default()
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KbSnapshot {
            entities: Some(ids.into_iter().map(Into::into).collect()),
        }
    }

    /// Load one entity id per line; blank lines are ignored.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading KB snapshot of proper named entities from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_ids(
            content.lines().map(str::trim).filter(|l| !l.is_empty()),
        ))
    }

    pub fn is_loaded(&self) -> bool {
        self.entities.is_some()
    }

    pub fn len(&self) -> usize {
        self.entities.as_ref().map_or(0, HashSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the entity is a proper-name entity.
    pub fn is_name_entity(&self, id: &str) -> bool {
        self.entities.as_ref().is_none_or(|set| set.contains(id))
    }
}
