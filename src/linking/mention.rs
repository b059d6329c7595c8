//! Candidate entities of a single mention.

use std::collections::BTreeMap;

use crate::catalog::EntityCatalog;
use crate::error::Result;

/// A query span looked up in the surface-form table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    text: String,
}

impl Mention {
    pub fn new(text: &str) -> Self {
        Mention {
            text: text.trim().to_lowercase(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn num_words(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Raw link counts of the mention over the given sources, keyed by the
    /// surface-form table's entity ids.
    pub fn link_counts(
        &self,
        catalog: &EntityCatalog,
        sources: &[String],
    ) -> Result<BTreeMap<String, f64>> {
        let matches = catalog.lookup_surface_form(&self.text)?;
        let mut counts: BTreeMap<String, f64> = BTreeMap::new();
        for source in sources {
            if let Some(entities) = matches.get(source) {
                for (entity, count) in entities {
                    *counts.entry(entity.clone()).or_default() += count;
                }
            }
        }
        Ok(counts)
    }

    /// Candidate entities with their scores.
    ///
    /// With a commonness threshold, counts are normalized to `count / Σcount`
    /// and entities below the threshold are dropped; otherwise raw counts
    /// are returned. Ids are mapped to the entity catalog; unmapped ids are
    /// skipped and when several ids map to the same entity the highest score
    /// wins.
    pub fn candidates(
        &self,
        catalog: &EntityCatalog,
        sources: &[String],
        cmns_threshold: Option<f64>,
    ) -> Result<BTreeMap<String, f64>> {
        let counts = self.link_counts(catalog, sources)?;
        map_candidates(catalog, counts, cmns_threshold)
    }
}

/// Map raw link counts to catalog entities, as [`Mention::candidates`] does.
pub fn map_candidates(
    catalog: &EntityCatalog,
    counts: BTreeMap<String, f64>,
    cmns_threshold: Option<f64>,
) -> Result<BTreeMap<String, f64>> {
    let scores = match cmns_threshold {
        Some(_) => commonness_scores(&counts),
        None => counts,
    };

    let mut candidates: BTreeMap<String, f64> = BTreeMap::new();
    for (id, score) in scores {
        let Some(entity_ids) = catalog.map_id(&id)? else {
            continue;
        };
        for entity_id in entity_ids {
            let entry = candidates.entry(entity_id).or_insert(score);
            if score > *entry {
                *entry = score;
            }
        }
    }

    if let Some(th) = cmns_threshold {
        candidates.retain(|_, cmns| *cmns >= th);
    }
    Ok(candidates)
}

/// Normalize counts to `count / Σcount`; empty when the total is 0.
pub fn commonness_scores(counts: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    let total: f64 = counts.values().sum();
    if total <= 0.0 {
        return BTreeMap::new();
    }
    counts
        .iter()
        .map(|(entity, count)| (entity.clone(), count / total))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryStore;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn catalog() -> EntityCatalog {
        let surface_forms = MemoryStore::from_json_str(
            r#"{"obama": {"facc12": {"<fb:m.x>": 30, "<fb:m.z>": 5, "<fb:m.rare>": 1},
                          "wiki": {"<fb:m.x>": 10}},
                "new york": {"facc12": {"<fb:m.ny>": 4, "<fb:m.nyc>": 4}}}"#,
        )
        .unwrap();
        let id_map = MemoryStore::from_json_str(
            r#"{"<fb:m.x>": {"!<owl:sameAs>": ["<dbpedia:Barack_Obama>"]},
                "<fb:m.z>": {"!<owl:sameAs>": ["<dbpedia:Obama_Japan>"]},
                "<fb:m.ny>": {"!<owl:sameAs>": ["<dbpedia:New_York>"]},
                "<fb:m.nyc>": {"!<owl:sameAs>": ["<dbpedia:New_York>"]}}"#,
        )
        .unwrap();
        EntityCatalog::new(Arc::new(MemoryStore::new()), Arc::new(surface_forms))
            .with_id_map(Arc::new(id_map))
    }

    fn facc() -> Vec<String> {
        vec!["facc12".to_string()]
    }

    #[test]
    fn test_commonness_candidates() {
        let cands = Mention::new(" Obama ")
            .candidates(&catalog(), &facc(), Some(0.1))
            .unwrap();
        assert_eq!(cands.len(), 2);
        assert!((cands["<dbpedia:Barack_Obama>"] - 30.0 / 36.0).abs() < 1e-12);
        assert!((cands["<dbpedia:Obama_Japan>"] - 5.0 / 36.0).abs() < 1e-12);
    }

    #[test]
    fn test_raw_counts_without_threshold() {
        let cands = Mention::new("obama")
            .candidates(&catalog(), &facc(), None)
            .unwrap();
        // the unmapped id is dropped
        assert_eq!(cands.len(), 2);
        assert_eq!(cands["<dbpedia:Barack_Obama>"], 30.0);
    }

    #[test]
    fn test_sources_are_summed() {
        let sources = vec!["facc12".to_string(), "wiki".to_string()];
        let counts = Mention::new("obama").link_counts(&catalog(), &sources).unwrap();
        assert_eq!(counts["<fb:m.x>"], 40.0);
    }

    #[test]
    fn test_mapping_collision_keeps_max() {
        let cands = Mention::new("new york")
            .candidates(&catalog(), &facc(), Some(0.1))
            .unwrap();
        assert_eq!(cands.len(), 1);
        assert_eq!(cands["<dbpedia:New_York>"], 0.5);
    }

    #[test]
    fn test_unknown_mention() {
        let cands = Mention::new("nobody")
            .candidates(&catalog(), &facc(), Some(0.1))
            .unwrap();
        assert!(cands.is_empty());
    }

    proptest! {
        #[test]
        fn commonness_sums_to_one(counts in prop::collection::vec(1u32..1000, 1..20)) {
            let counts: BTreeMap<String, f64> = counts
                .iter()
                .enumerate()
                .map(|(i, c)| (format!("e{i}"), f64::from(*c)))
                .collect();
            let scores = commonness_scores(&counts);
            let total: f64 = scores.values().sum();
            prop_assert!((total - 1.0).abs() < 1e-9);
            prop_assert!(scores.values().all(|s| (0.0..=1.0).contains(s)));
        }
    }
}
