//! Integration tests for mention generation, commonness and greedy
//! disambiguation.

use std::collections::BTreeMap;
use std::sync::Arc;

use lexlink::catalog::{EntityCatalog, KbSnapshot, MemoryStore};
use lexlink::config::{LinkingConfig, LinkingMethod, LinkingStep};
use lexlink::linking::greedy::{self, Greedy, PROP_ENTITY, PROP_MENTION};
use lexlink::linking::ltr::PROP_QID;
use lexlink::linking::mention::commonness_scores;
use lexlink::linking::{CandidateGenerator, Cmns, EntityLinker, LinkedEntity};
use lexlink::ml::{Instance, Instances};
use lexlink::query::Query;
use lexlink::stats::MemoryIndex;
use proptest::prelude::*;
use tempfile::TempDir;

const BARACK_OBAMA: &str = "<dbpedia:Barack_Obama>";
const HONOLULU: &str = "<dbpedia:Honolulu>";

fn catalog() -> EntityCatalog {
    let entities = MemoryStore::from_json_str(
        r#"{"<dbpedia:Barack_Obama>": {"<rdfs:label>": ["Barack Obama"]},
            "<dbpedia:Honolulu>": {"<rdfs:label>": ["Honolulu"]}}"#,
    )
    .unwrap();
    let surface_forms = MemoryStore::from_json_str(
        r#"{"barack obama": {"facc12": {"<dbpedia:Barack_Obama>": 50}},
            "obama": {"facc12": {"<dbpedia:Barack_Obama>": 30, "<dbpedia:Obama_Japan>": 5}},
            "honolulu": {"facc12": {"<dbpedia:Honolulu>": 10}}}"#,
    )
    .unwrap();
    EntityCatalog::new(Arc::new(entities), Arc::new(surface_forms))
}

fn generator() -> CandidateGenerator {
    CandidateGenerator::new(catalog(), vec!["facc12".to_string()], Some(0.1))
}

fn instance(qid: &str, mention: &str, entity: &str, score: f64) -> Instance {
    let mut ins = Instance::new(format!("{qid}-{entity}-{mention}"));
    ins.add_property(PROP_QID, qid);
    ins.add_property(PROP_MENTION, mention);
    ins.add_property(PROP_ENTITY, entity);
    ins.score = Some(score);
    ins
}

#[test]
fn test_non_overlapping_mentions_form_one_interpretation() {
    let query = Query::new("barack obama born honolulu");
    let candidates = generator().generate(&query).unwrap();
    assert_eq!(
        candidates.keys().collect::<Vec<_>>(),
        vec!["barack obama", "honolulu"]
    );

    let instances: Instances = candidates
        .iter()
        .flat_map(|(mention, entities)| {
            entities
                .iter()
                .map(move |(entity, score)| instance("q1", mention, entity, *score))
        })
        .collect();
    let interpretations = Greedy::new(0.1).disambiguate(&instances);
    assert_eq!(interpretations.len(), 1);

    let set = &interpretations[0];
    assert_eq!(set.len(), 2);
    assert_eq!(set["barack obama"], (BARACK_OBAMA.to_string(), 1.0));
    assert_eq!(set["honolulu"], (HONOLULU.to_string(), 1.0));
}

#[test]
fn test_longest_mention_wins() {
    let candidates = generator().generate(&Query::new("barack obama")).unwrap();
    assert_eq!(candidates.len(), 1);
    assert!(candidates.contains_key("barack obama"));
    assert!(!candidates.contains_key("obama"));

    // on its own, "obama" is a mention with both candidates
    let candidates = generator().generate(&Query::new("obama")).unwrap();
    assert_eq!(candidates["obama"].len(), 2);
}

#[test]
fn test_cmns_linking_end_to_end() {
    let cmns = Cmns::new(generator(), 0.1, KbSnapshot::unloaded());
    let linked = cmns.link(&Query::new("Barack Obama born Honolulu?")).unwrap();
    assert_eq!(
        linked,
        vec![
            LinkedEntity::new("barack obama", BARACK_OBAMA, 1.0),
            LinkedEntity::new("honolulu", HONOLULU, 1.0),
        ]
    );
}

#[test]
fn test_ngram_count() {
    for (query, len) in [("a", 1), ("a b c", 3), ("one two three four five", 5)] {
        assert_eq!(Query::new(query).ngrams().len(), len * (len + 1) / 2);
    }
}

#[test]
fn test_batch_disambiguation_from_test_set() {
    let dir = TempDir::new().unwrap();
    let test_set = dir.path().join("test_set.json");
    let output_file = dir.path().join("run.elq");

    let instances: Instances = vec![
        instance("q1", "barack obama", BARACK_OBAMA, 0.9),
        instance("q1", "barack obama", "<dbpedia:Barack_Obama_Sr>", 0.05),
        instance("q2", "honolulu", HONOLULU, 0.7),
        instance("q2", "honolulu", "<dbpedia:Honolulu_County>", 0.05),
    ]
    .into_iter()
    .collect();
    instances.to_json_file(&test_set).unwrap();

    let config = LinkingConfig {
        method: LinkingMethod::Cmns,
        step: LinkingStep::Disambiguation,
        test_set: Some(test_set),
        output_file: Some(output_file.clone()),
        ..LinkingConfig::default()
    };
    let index = MemoryIndex::new();
    let mut linker =
        EntityLinker::from_parts(config, catalog(), &index, KbSnapshot::unloaded(), None).unwrap();
    linker.batch_linking().unwrap();

    let run = std::fs::read_to_string(output_file).unwrap();
    assert_eq!(
        run,
        format!("q1\t1\t{BARACK_OBAMA}\nq2\t1\t{HONOLULU}\n")
    );
}

fn mention_strategy() -> impl Strategy<Value = (String, f64)> {
    let words = ["new", "york", "city", "times", "square", "garden"];
    (0..words.len(), 1..=3usize, 0.0..1.0f64).prop_map(move |(start, len, score)| {
        let end = (start + len).min(words.len());
        (words[start..end].join(" "), score)
    })
}

proptest! {
    #[test]
    fn prop_commonness_sums_to_one(counts in prop::collection::btree_map("[a-z]{1,8}", 1u32..10_000, 1..20)) {
        let counts: BTreeMap<String, f64> =
            counts.into_iter().map(|(e, c)| (e, c as f64)).collect();
        let scores = commonness_scores(&counts);
        prop_assert_eq!(scores.len(), counts.len());
        let total: f64 = scores.values().sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn prop_interpretations_never_share_words(
        mentions in prop::collection::vec(mention_strategy(), 1..12),
    ) {
        let instances: Instances = mentions
            .iter()
            .enumerate()
            .map(|(i, (mention, score))| instance("q", mention, &format!("<e{}>", i % 3), *score))
            .collect();
        let interpretations = Greedy::new(0.0).disambiguate(&instances);
        for set in &interpretations {
            prop_assert!(!set.is_empty());
            prop_assert!(!greedy::is_overlapping(set.keys().map(String::as_str)));
        }
    }
}
