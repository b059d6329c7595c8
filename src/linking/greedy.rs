//! Greedy construction of interpretation sets from scored instances.

use std::collections::{BTreeMap, HashSet};

use log::debug;

use crate::linking::{Interpretation, LinkedEntity, sort_linked};
use crate::ml::{Instance, Instances};

/// Instance property holding the mention text.
pub const PROP_MENTION: &str = "mention";
/// Instance property holding the entity id.
pub const PROP_ENTITY: &str = "en_id";

#[derive(Debug, Clone, Copy)]
pub struct Greedy {
    score_threshold: f64,
}

impl Greedy {
    pub fn new(score_threshold: f64) -> Self {
        Greedy { score_threshold }
    }

    /// Interpretation sets of one query's instances.
    pub fn disambiguate(&self, instances: &Instances) -> Vec<Interpretation> {
        let pruned = self.prune_by_score(instances);
        let pruned = prune_containment_mentions(pruned);
        let interpretations = create_interpretations(&pruned);
        debug!(
            "{} instances -> {} kept -> {} interpretations",
            instances.len(),
            pruned.len(),
            interpretations.len()
        );
        interpretations
    }

    /// Drop unscored instances and those below the threshold.
    pub fn prune_by_score<'a>(&self, instances: &'a Instances) -> Vec<&'a Instance> {
        instances
            .all()
            .iter()
            .filter(|ins| ins.score.is_some_and(|s| s >= self.score_threshold))
            .collect()
    }
}

fn mention_of(ins: &Instance) -> String {
    ins.property_str(PROP_MENTION).unwrap_or_default()
}

fn entity_of(ins: &Instance) -> String {
    ins.property_str(PROP_ENTITY).unwrap_or_default()
}

/// Keep, by descending score, instances whose mention neither contains nor
/// lies inside a different, already kept mention. Equal scores are ordered
/// by mention, then entity id.
pub fn prune_containment_mentions(mut instances: Vec<&Instance>) -> Vec<&Instance> {
    instances.sort_by(|a, b| {
        b.score_or_zero()
            .total_cmp(&a.score_or_zero())
            .then_with(|| mention_of(a).cmp(&mention_of(b)))
            .then_with(|| entity_of(a).cmp(&entity_of(b)))
    });

    let mut kept: Vec<&Instance> = Vec::new();
    let mut kept_mentions: Vec<String> = Vec::new();
    for ins in instances {
        let cand = mention_of(ins);
        let contained = kept_mentions
            .iter()
            .any(|m| *m != cand && (m.contains(cand.as_str()) || cand.contains(m.as_str())));
        if !contained {
            kept.push(ins);
            if !kept_mentions.contains(&cand) {
                kept_mentions.push(cand);
            }
        }
    }
    kept
}

/// Insert each instance into the first interpretation set it does not
/// overlap with, opening a new set when none accepts it.
pub fn create_interpretations(instances: &[&Instance]) -> Vec<Interpretation> {
    let mut interpretations: Vec<Interpretation> = vec![Interpretation::new()];
    for ins in instances {
        let mention = mention_of(ins);
        let value = (entity_of(ins), ins.score_or_zero());
        let target = interpretations.iter_mut().find(|inter| {
            !inter.contains_key(&mention)
                && !is_overlapping(inter.keys().map(String::as_str).chain([mention.as_str()]))
        });
        match target {
            Some(inter) => {
                inter.insert(mention, value);
            }
            None => {
                let mut inter = Interpretation::new();
                inter.insert(mention, value);
                interpretations.push(inter);
            }
        }
    }
    interpretations
}

/// Whether any word occurs in more than one of the mentions. Repeated words
/// within one mention do not count.
pub fn is_overlapping<'a, I: IntoIterator<Item = &'a str>>(mentions: I) -> bool {
    let mut seen: HashSet<&str> = HashSet::new();
    for mention in mentions {
        let words: HashSet<&str> = mention.split_whitespace().collect();
        for word in words {
            if !seen.insert(word) {
                return true;
            }
        }
    }
    false
}

/// Unique (mention, entity) pairs across all sets with their highest score,
/// by descending score.
pub fn flatten(interpretations: &[Interpretation]) -> Vec<LinkedEntity> {
    let mut best: BTreeMap<(String, String), f64> = BTreeMap::new();
    for inter in interpretations {
        for (mention, (entity, score)) in inter {
            let entry = best
                .entry((mention.clone(), entity.clone()))
                .or_insert(*score);
            if *score > *entry {
                *entry = *score;
            }
        }
    }
    let mut linked: Vec<LinkedEntity> = best
        .into_iter()
        .map(|((mention, entity), score)| LinkedEntity::new(mention, entity, score))
        .collect();
    sort_linked(&mut linked);
    linked
}
