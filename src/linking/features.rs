//! Ranking features of (mention, entity, query) instances.
//!
//! Features fall into four groups:
//!
//! | group          | features                                   |
//! |----------------|--------------------------------------------|
//! | entity         | `outlinks`, `redirects`                    |
//! | mention        | `len_ratio`, `mention_len`, `matches`      |
//! | entity-mention | `commonness`, `mct`, `tcm`, `tem`, `pos1`  |
//! | similarity     | `lm_score`, `context_sim`, `mlm_score`     |
//!
//! Similarity features are `exp(NLLR)` of a text against the entity's
//! indexed fields, where
//!
//! ```text
//! NLLR(q,d) = Σ_t P(t|q)·log P(t|θd) − Σ_t P(t|q)·log P(t|C)
//! P(t|q) = n(t,q)/|q|        P(t|C) = Σ_f w_f·ctf(t,f)/|C_f|
//! ```
//!
//! A feature that cannot be computed (missing entity, unreachable store)
//! takes its default value and a warning is logged.

use std::collections::BTreeMap;

use ahash::AHashMap;
use log::warn;

use crate::catalog::{EntityCatalog, EntityDocument};
use crate::error::Result;
use crate::linking::mention::{Mention, map_candidates};
use crate::query::{Query, normalize};
use crate::scoring::{ScorerMlm, Smoothing, distinct_terms};
use crate::stats::StatsCache;

pub const FTR_COMMONNESS: &str = "commonness";
pub const FTR_CONTEXT_SIM: &str = "context_sim";
pub const FTR_LEN_RATIO: &str = "len_ratio";
pub const FTR_LM_SCORE: &str = "lm_score";
pub const FTR_MATCHES: &str = "matches";
pub const FTR_MCT: &str = "mct";
pub const FTR_MENTION_LEN: &str = "mention_len";
pub const FTR_MLM_SCORE: &str = "mlm_score";
pub const FTR_OUTLINKS: &str = "outlinks";
pub const FTR_POS1: &str = "pos1";
pub const FTR_REDIRECTS: &str = "redirects";
pub const FTR_TCM: &str = "tcm";
pub const FTR_TEM: &str = "tem";

/// Position reported when the mention is absent from the short abstract.
pub const POS1_NOT_FOUND: f64 = 1000.0;

/// Feature values keyed by `(feature_name, key)`, plus fetched entity
/// documents and per-mention link counts and candidate sets.
#[derive(Debug, Default)]
pub struct FeatureCache {
    values: AHashMap<(String, String), f64>,
    entities: AHashMap<String, Option<EntityDocument>>,
    link_counts: AHashMap<String, BTreeMap<String, f64>>,
    candidates: AHashMap<String, BTreeMap<String, f64>>,
}

impl FeatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, feature_name: &str, key: &str) -> Option<f64> {
        self.values
            .get(&(feature_name.to_string(), key.to_string()))
            .copied()
    }

    pub fn set(&mut self, feature_name: &str, key: &str, value: f64) {
        self.values
            .insert((feature_name.to_string(), key.to_string()), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.entities.clear();
        self.link_counts.clear();
        self.candidates.clear();
    }
}

fn pair_key(a: &str, b: &str) -> String {
    format!("{a}\t{b}")
}

/// Jaccard similarity of the word sets of two strings; 0 when both are empty.
pub fn jaccard(s1: &str, s2: &str) -> f64 {
    let set1: std::collections::HashSet<&str> = s1.split_whitespace().collect();
    let set2: std::collections::HashSet<&str> = s2.split_whitespace().collect();
    let union = set1.union(&set2).count();
    if union == 0 {
        return 0.0;
    }
    set1.intersection(&set2).count() as f64 / union as f64
}

/// Normalized log-likelihood ratio of analyzed query terms against a
/// document. `None` when no query term occurs in the weighted fields.
pub fn nllr(
    stats: &mut StatsCache<'_>,
    doc_id: &str,
    query_terms: &[String],
    field_weights: &BTreeMap<String, f64>,
    smoothing: &Smoothing,
) -> Result<Option<f64>> {
    if query_terms.is_empty() {
        return Ok(None);
    }
    let scorer = ScorerMlm::new(field_weights.clone(), smoothing.clone(), query_terms.to_vec());
    let term_probs = scorer.term_probs(stats, doc_id)?;
    if term_probs.values().sum::<f64>() == 0.0 {
        return Ok(None);
    }

    let query_len = query_terms.len() as f64;
    let mut left_sum = 0.0;
    let mut right_sum = 0.0;
    for term in distinct_terms(query_terms) {
        let p_t_theta_d = term_probs.get(term).copied().unwrap_or(0.0);
        if p_t_theta_d <= 0.0 {
            continue;
        }
        let p_t_c = term_collection_prob(stats, term, field_weights)?;
        if p_t_c <= 0.0 {
            continue;
        }
        let query_tf = query_terms.iter().filter(|t| *t == term).count() as f64;
        let p_t_q = query_tf / query_len;
        left_sum += p_t_q * p_t_theta_d.ln();
        right_sum += p_t_q * p_t_c.ln();
    }
    Ok(Some(left_sum - right_sum))
}

/// `P(t|C) = Σ_f w_f·ctf(t,f)/|C_f|`, empty fields contributing 0.
fn term_collection_prob(
    stats: &mut StatsCache<'_>,
    term: &str,
    field_weights: &BTreeMap<String, f64>,
) -> Result<f64> {
    let mut p = 0.0;
    for (field, weight) in field_weights {
        let len_c = stats.coll_length(field)?;
        if len_c == 0 {
            continue;
        }
        let tf_c = stats.coll_term_freq(term, field)?;
        p += weight * tf_c as f64 / len_c as f64;
    }
    Ok(p)
}

/// Computes and caches features for one worker.
#[derive(Debug)]
pub struct FeatureExtractor<'a> {
    catalog: EntityCatalog,
    stats: StatsCache<'a>,
    cache: FeatureCache,
    sources: Vec<String>,
    similarity_field: String,
    mlm_fields: Option<BTreeMap<String, f64>>,
    smoothing: Smoothing,
}

impl<'a> FeatureExtractor<'a> {
    pub fn new(
        catalog: EntityCatalog,
        stats: StatsCache<'a>,
        sources: Vec<String>,
        similarity_field: &str,
    ) -> Self {
        FeatureExtractor {
            catalog,
            stats,
            cache: FeatureCache::new(),
            sources,
            similarity_field: similarity_field.to_string(),
            mlm_fields: None,
            smoothing: Smoothing::default(),
        }
    }

    /// Enable the `mlm_score` feature.
    pub fn with_mlm_fields(mut self, field_weights: BTreeMap<String, f64>) -> Self {
        self.mlm_fields = Some(field_weights);
        self
    }

    pub fn with_smoothing(mut self, smoothing: Smoothing) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn cache(&self) -> &FeatureCache {
        &self.cache
    }

    pub fn stats(&self) -> &StatsCache<'a> {
        &self.stats
    }

    /// Names of the extracted features, alphabetically.
    pub fn feature_names(&self) -> Vec<&'static str> {
        let mut names = vec![
            FTR_COMMONNESS,
            FTR_CONTEXT_SIM,
            FTR_LEN_RATIO,
            FTR_LM_SCORE,
            FTR_MATCHES,
            FTR_MCT,
            FTR_MENTION_LEN,
            FTR_OUTLINKS,
            FTR_POS1,
            FTR_REDIRECTS,
            FTR_TCM,
            FTR_TEM,
        ];
        if self.mlm_fields.is_some() {
            names.push(FTR_MLM_SCORE);
            names.sort_unstable();
        }
        names
    }

    /// All features of an instance. Failing features fall back to their
    /// default value.
    pub fn extract(&mut self, en_id: &str, mention: &str, query: &Query) -> BTreeMap<String, f64> {
        let mention = mention.trim().to_lowercase();
        let text = query.normalized();
        let mut features = BTreeMap::new();

        let entity_features = [
            (FTR_OUTLINKS, self.outlinks(en_id)),
            (FTR_REDIRECTS, self.redirects(en_id)),
            (FTR_LEN_RATIO, Ok(len_ratio(&mention, text))),
            (FTR_MENTION_LEN, Ok(mention_len(&mention))),
            (FTR_MATCHES, self.matches(&mention)),
            (FTR_COMMONNESS, self.commonness(en_id, &mention)),
            (FTR_MCT, self.mct(en_id, &mention)),
            (FTR_TCM, self.tcm(en_id, &mention)),
            (FTR_TEM, self.tem(en_id, &mention)),
            (FTR_POS1, self.pos1(en_id, &mention)),
            (FTR_LM_SCORE, self.lm_score(en_id, text)),
            (FTR_CONTEXT_SIM, self.context_sim(en_id, &mention, text)),
        ];
        for (name, value) in entity_features {
            features.insert(name.to_string(), self.or_default(name, en_id, value));
        }
        if self.mlm_fields.is_some() {
            let value = self.mlm_score(en_id, text);
            features.insert(
                FTR_MLM_SCORE.to_string(),
                self.or_default(FTR_MLM_SCORE, en_id, value),
            );
        }
        features
    }

    fn or_default(&self, name: &str, en_id: &str, value: Result<f64>) -> f64 {
        value.unwrap_or_else(|e| {
            warn!("Feature {name} of {en_id} not computable: {e}");
            default_value(name)
        })
    }

    /// Cached value of a feature, or compute and store it.
    fn cached<F>(&mut self, feature_name: &str, key: &str, compute: F) -> Result<f64>
    where
        F: FnOnce(&mut Self) -> Result<f64>,
    {
        if let Some(value) = self.cache.get(feature_name, key) {
            return Ok(value);
        }
        let value = compute(self)?;
        self.cache.set(feature_name, key, value);
        Ok(value)
    }

    fn load_entity(&mut self, en_id: &str) -> Result<()> {
        if !self.cache.entities.contains_key(en_id) {
            let doc = self.catalog.lookup_entity(en_id)?;
            if doc.is_none() {
                warn!("Entity {en_id} not found in the catalog");
            }
            self.cache.entities.insert(en_id.to_string(), doc);
        }
        Ok(())
    }

    fn entity(&mut self, en_id: &str) -> Result<Option<&EntityDocument>> {
        self.load_entity(en_id)?;
        Ok(self.cache.entities.get(en_id).and_then(Option::as_ref))
    }

    /// Surface-form ids of the entity, read from the cached entity document.
    fn surface_form_ids(&mut self, en_id: &str) -> Result<Option<Vec<String>>> {
        if !self.catalog.has_id_map() {
            return Ok(Some(vec![en_id.to_string()]));
        }
        self.load_entity(en_id)?;
        Ok(self
            .cache
            .entities
            .get(en_id)
            .and_then(Option::as_ref)
            .and_then(|entity| self.catalog.reverse_map_document(entity)))
    }

    /// Raw link counts of the mention, fetched once per mention.
    fn link_counts(&mut self, mention: &str) -> Result<&BTreeMap<String, f64>> {
        if !self.cache.link_counts.contains_key(mention) {
            let counts = Mention::new(mention).link_counts(&self.catalog, &self.sources)?;
            self.cache.link_counts.insert(mention.to_string(), counts);
        }
        Ok(&self.cache.link_counts[mention])
    }

    /// Normalized entity title; empty when the entity has none.
    fn title(&mut self, en_id: &str) -> Result<String> {
        Ok(self
            .entity(en_id)?
            .and_then(EntityDocument::name)
            .map(normalize)
            .unwrap_or_default())
    }

    /// Number of distinct out-links of the entity.
    pub fn outlinks(&mut self, en_id: &str) -> Result<f64> {
        self.cached(FTR_OUTLINKS, en_id, |fx| {
            Ok(fx.entity(en_id)?.map_or(0, EntityDocument::outlinks) as f64)
        })
    }

    /// Number of distinct redirect pages pointing at the entity.
    pub fn redirects(&mut self, en_id: &str) -> Result<f64> {
        self.cached(FTR_REDIRECTS, en_id, |fx| {
            Ok(fx.entity(en_id)?.map_or(0, EntityDocument::redirects) as f64)
        })
    }

    /// Candidate entities of the mention, without commonness filtering.
    pub fn mention_candidates(&mut self, mention: &str) -> Result<&BTreeMap<String, f64>> {
        if !self.cache.candidates.contains_key(mention) {
            let counts = self.link_counts(mention)?.clone();
            let cands = map_candidates(&self.catalog, counts, None)?;
            self.cache.candidates.insert(mention.to_string(), cands);
        }
        Ok(&self.cache.candidates[mention])
    }

    /// Number of distinct entities the mention can refer to.
    pub fn matches(&mut self, mention: &str) -> Result<f64> {
        Ok(self.mention_candidates(mention)?.len() as f64)
    }

    /// `link(e,m) / link(m)`; 0 when the mention is never linked.
    pub fn commonness(&mut self, en_id: &str, mention: &str) -> Result<f64> {
        self.cached(FTR_COMMONNESS, &pair_key(en_id, mention), |fx| {
            let Some(ids) = fx.surface_form_ids(en_id)? else {
                return Ok(0.0);
            };
            let counts = fx.link_counts(mention)?;
            let total: f64 = counts.values().sum();
            Ok(match ids.first() {
                Some(id) if total > 0.0 => counts.get(id).copied().unwrap_or(0.0) / total,
                _ => 0.0,
            })
        })
    }

    /// 1 when the mention contains the entity title.
    pub fn mct(&mut self, en_id: &str, mention: &str) -> Result<f64> {
        // An empty title is not treated as a substring of every mention,
        // so untitled entities get 0.
        let title = self.title(en_id)?;
        Ok(indicator(!title.is_empty() && mention.contains(title.as_str())))
    }

    /// 1 when the entity title contains the mention.
    pub fn tcm(&mut self, en_id: &str, mention: &str) -> Result<f64> {
        let title = self.title(en_id)?;
        Ok(indicator(!title.is_empty() && title.contains(mention)))
    }

    /// 1 when the entity title equals the mention.
    pub fn tem(&mut self, en_id: &str, mention: &str) -> Result<f64> {
        let title = self.title(en_id)?;
        Ok(indicator(!title.is_empty() && title == mention))
    }

    /// Character offset of the mention in the lower-cased short abstract.
    pub fn pos1(&mut self, en_id: &str, mention: &str) -> Result<f64> {
        let short_abstract = self
            .entity(en_id)?
            .and_then(EntityDocument::short_abstract)
            .map(str::to_lowercase)
            .unwrap_or_default();
        Ok(match short_abstract.find(mention) {
            Some(byte) => short_abstract[..byte].chars().count() as f64,
            None => POS1_NOT_FOUND,
        })
    }

    fn similarity(&mut self, en_id: &str, text: &str, fields: &BTreeMap<String, f64>) -> Result<f64> {
        let analyzed = self.stats.service().analyze_query(text)?;
        let terms: Vec<String> = analyzed.split_whitespace().map(str::to_string).collect();
        let score = nllr(&mut self.stats, en_id, &terms, fields, &self.smoothing)?;
        // a zero NLLR is reported as 0
        Ok(score.filter(|s| *s != 0.0).map_or(0.0, f64::exp))
    }

    fn single_field(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([(self.similarity_field.clone(), 1.0)])
    }

    /// Similarity of the whole query to the entity.
    pub fn lm_score(&mut self, en_id: &str, query: &str) -> Result<f64> {
        self.cached(FTR_LM_SCORE, &pair_key(en_id, query), |fx| {
            let fields = fx.single_field();
            fx.similarity(en_id, query, &fields)
        })
    }

    /// Similarity of the query context (query minus the first occurrence of
    /// the mention) to the entity. 0 when the mention is not in the query.
    pub fn context_sim(&mut self, en_id: &str, mention: &str, query: &str) -> Result<f64> {
        let Some(start) = query.find(mention).filter(|_| !mention.is_empty()) else {
            warn!("Mention \"{mention}\" is not found in the query \"{query}\"");
            return Ok(0.0);
        };
        let context = format!("{}{}", &query[..start], &query[start + mention.len()..]);
        let context = context.trim();

        self.cached(FTR_CONTEXT_SIM, &pair_key(en_id, context), |fx| {
            let fields = fx.single_field();
            fx.similarity(en_id, context, &fields)
        })
    }

    /// Multi-field similarity of the query to the entity; 0 when no field
    /// weights are configured.
    pub fn mlm_score(&mut self, en_id: &str, query: &str) -> Result<f64> {
        let Some(fields) = self.mlm_fields.clone() else {
            return Ok(0.0);
        };
        self.cached(FTR_MLM_SCORE, &pair_key(en_id, query), |fx| {
            fx.similarity(en_id, query, &fields)
        })
    }
}

/// Mention words over query terms.
pub fn len_ratio(mention: &str, query: &str) -> f64 {
    let query_len = query.split_whitespace().count();
    if query_len == 0 {
        return 0.0;
    }
    mention.split_whitespace().count() as f64 / query_len as f64
}

pub fn mention_len(mention: &str) -> f64 {
    mention.split_whitespace().count() as f64
}

fn indicator(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn default_value(name: &str) -> f64 {
    if name == FTR_POS1 { POS1_NOT_FOUND } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Document, DocumentStore, MemoryStore};
    use crate::stats::{MemoryIndex, TextSearchService};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn catalog() -> EntityCatalog {
        let entities = MemoryStore::from_json_str(
            r#"{"<dbpedia:Barack_Obama>": {
                    "<rdfs:label>": ["Barack Obama"],
                    "<rdfs:comment>": ["The 44th president, Barack Obama was born in Honolulu."],
                    "<dbo:wikiPageWikiLink>": ["<dbpedia:Honolulu>", "<dbpedia:Hawaii>", "<dbpedia:Honolulu>"],
                    "!<dbo:wikiPageRedirects>": ["<dbpedia:Obama>"]},
                "<dbpedia:Honolulu>": {"<rdfs:label>": ["Honolulu"]},
                "<dbpedia:Untitled>": {"<rdfs:label>": [""]}}"#,
        )
        .unwrap();
        let surface_forms = MemoryStore::from_json_str(
            r#"{"obama": {"facc12": {"<dbpedia:Barack_Obama>": 30, "<dbpedia:Obama_Japan>": 10}},
                "barack obama": {"facc12": {"<dbpedia:Barack_Obama>": 50}}}"#,
        )
        .unwrap();
        EntityCatalog::new(Arc::new(entities), Arc::new(surface_forms))
    }

    fn index() -> MemoryIndex {
        let mut index = MemoryIndex::new();
        index.add_document(
            "<dbpedia:Barack_Obama>",
            [("names", "barack obama"), ("body", "president born in honolulu hawaii")],
        );
        index.add_document(
            "<dbpedia:Honolulu>",
            [("names", "honolulu"), ("body", "capital city of hawaii")],
        );
        index
    }

    fn extractor(index: &MemoryIndex) -> FeatureExtractor<'_> {
        FeatureExtractor::new(
            catalog(),
            StatsCache::new(index),
            vec!["facc12".to_string()],
            "catchall",
        )
    }

    #[test]
    fn test_feature_values_are_cached() {
        let index = index();
        let mut fx = extractor(&index);
        let v = fx.cached(FTR_MATCHES, "obama", |_| Ok(2.0)).unwrap();
        assert_eq!(v, 2.0);
        let v = fx
            .cached(FTR_MATCHES, "obama", |_| panic!("recomputed"))
            .unwrap();
        assert_eq!(v, 2.0);
        assert_eq!(fx.cache().get(FTR_MATCHES, "obama"), Some(2.0));
        assert_eq!(fx.cache().len(), 1);
    }

    /// Counts the lookups that reach the wrapped store.
    #[derive(Debug)]
    struct CountingStore {
        inner: MemoryStore,
        lookups: Arc<AtomicUsize>,
    }

    impl DocumentStore for CountingStore {
        fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_id(id)
        }
    }

    fn counting(json: &str) -> (Arc<CountingStore>, Arc<AtomicUsize>) {
        let lookups = Arc::new(AtomicUsize::new(0));
        let store = CountingStore {
            inner: MemoryStore::from_json_str(json).unwrap(),
            lookups: Arc::clone(&lookups),
        };
        (Arc::new(store), lookups)
    }

    #[test]
    fn test_store_lookups_are_shared_across_instances() {
        let (entities, entity_lookups) = counting(
            r#"{"<dbpedia:Barack_Obama>": {"<rdfs:label>": ["Barack Obama"],
                                           "<owl:sameAs>": ["<fb:m.02mjmr>"]},
                "<dbpedia:Obama_Japan>": {"<rdfs:label>": ["Obama"],
                                          "<owl:sameAs>": ["<fb:m.0x>"]}}"#,
        );
        let (surface_forms, sf_lookups) = counting(
            r#"{"obama": {"facc12": {"<fb:m.02mjmr>": 30, "<fb:m.0x>": 10}}}"#,
        );
        let id_map = MemoryStore::from_json_str(
            r#"{"<fb:m.02mjmr>": {"!<owl:sameAs>": ["<dbpedia:Barack_Obama>"]},
                "<fb:m.0x>": {"!<owl:sameAs>": ["<dbpedia:Obama_Japan>"]}}"#,
        )
        .unwrap();
        let catalog = EntityCatalog::new(entities, surface_forms).with_id_map(Arc::new(id_map));

        let index = index();
        let mut fx = FeatureExtractor::new(
            catalog,
            StatsCache::new(&index),
            vec!["facc12".to_string()],
            "catchall",
        );
        let first = fx.extract("<dbpedia:Barack_Obama>", "obama", &Query::new("obama"));
        let second = fx.extract("<dbpedia:Barack_Obama>", "obama", &Query::new("obama family"));
        let other = fx.extract("<dbpedia:Obama_Japan>", "obama", &Query::new("obama"));

        assert_eq!(first[FTR_COMMONNESS], 0.75);
        assert_eq!(second[FTR_COMMONNESS], 0.75);
        assert_eq!(other[FTR_COMMONNESS], 0.25);
        assert_eq!(first[FTR_MATCHES], 2.0);
        assert_eq!(entity_lookups.load(Ordering::SeqCst), 2);
        assert_eq!(sf_lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_entity_features() {
        let index = index();
        let mut fx = extractor(&index);
        assert_eq!(fx.outlinks("<dbpedia:Barack_Obama>").unwrap(), 2.0);
        assert_eq!(fx.redirects("<dbpedia:Barack_Obama>").unwrap(), 1.0);
        assert_eq!(fx.outlinks("<dbpedia:Nobody>").unwrap(), 0.0);
    }

    #[test]
    fn test_mention_features() {
        let index = index();
        let mut fx = extractor(&index);
        assert_eq!(len_ratio("barack obama", "barack obama born honolulu"), 0.5);
        assert_eq!(mention_len("barack obama"), 2.0);
        assert_eq!(fx.matches("obama").unwrap(), 2.0);
        assert_eq!(fx.matches("nobody").unwrap(), 0.0);
    }

    #[test]
    fn test_entity_mention_features() {
        let index = index();
        let mut fx = extractor(&index);
        let en = "<dbpedia:Barack_Obama>";
        assert_eq!(fx.commonness(en, "obama").unwrap(), 0.75);
        assert_eq!(fx.commonness(en, "nobody").unwrap(), 0.0);
        assert_eq!(fx.mct(en, "barack obama born").unwrap(), 1.0);
        assert_eq!(fx.tcm(en, "obama").unwrap(), 1.0);
        assert_eq!(fx.tem(en, "obama").unwrap(), 0.0);
        assert_eq!(fx.tem(en, "barack obama").unwrap(), 1.0);
        assert_eq!(fx.pos1(en, "barack obama").unwrap(), 20.0);
        assert_eq!(fx.pos1(en, "kenya").unwrap(), POS1_NOT_FOUND);
        // an unknown entity has no title to compare with
        assert_eq!(fx.mct("<dbpedia:Nobody>", "obama").unwrap(), 0.0);
        // an empty label behaves like a missing one
        assert_eq!(fx.mct("<dbpedia:Untitled>", "obama").unwrap(), 0.0);
        assert_eq!(fx.tcm("<dbpedia:Untitled>", "obama").unwrap(), 0.0);
    }

    #[test]
    fn test_similarity_features() {
        let index = index();
        let mut fx = extractor(&index);
        let en = "<dbpedia:Barack_Obama>";
        let lm = fx.lm_score(en, "barack obama honolulu").unwrap();
        assert!(lm > 1.0);
        let other = fx.lm_score("<dbpedia:Honolulu>", "barack obama").unwrap();
        assert!(other < lm);
        assert_eq!(fx.lm_score(en, "zzz").unwrap(), 0.0);

        let context = fx.context_sim(en, "barack obama", "barack obama honolulu").unwrap();
        assert!(context > 0.0);
        assert_eq!(fx.context_sim(en, "kenya", "barack obama").unwrap(), 0.0);
    }

    #[test]
    fn test_zero_nllr_is_no_similarity() {
        // a single document is its own collection, so P(t|θd) = P(t|C)
        let mut index = MemoryIndex::new();
        index.add_document("<dbpedia:Honolulu>", [("catchall", "honolulu hawaii")]);
        let mut stats = StatsCache::new(&index);
        let terms = vec!["honolulu".to_string()];
        let fields = BTreeMap::from([("catchall".to_string(), 1.0)]);
        let score = nllr(&mut stats, "<dbpedia:Honolulu>", &terms, &fields, &Smoothing::default())
            .unwrap();
        assert_eq!(score, Some(0.0));

        let mut fx = extractor(&index);
        assert_eq!(fx.lm_score("<dbpedia:Honolulu>", "honolulu").unwrap(), 0.0);
    }

    #[test]
    fn test_nllr_matches_definition() {
        let index = index();
        let mut stats = StatsCache::new(&index);
        let terms = vec!["honolulu".to_string()];
        let fields = BTreeMap::from([("body".to_string(), 1.0)]);
        let smoothing = Smoothing::JelinekMercer { lambda: 0.5 };
        let score = nllr(&mut stats, "<dbpedia:Barack_Obama>", &terms, &fields, &smoothing)
            .unwrap()
            .unwrap();
        let coll_len = index.field_stats("body").unwrap().sum_total_term_freq as f64;
        let doc_len: u64 = index
            .term_vector("<dbpedia:Barack_Obama>", "body")
            .unwrap()
            .values()
            .sum();
        let p_c = 1.0 / coll_len;
        let p_d = 0.5 * (1.0 / doc_len as f64) + 0.5 * p_c;
        assert!((score - (p_d.ln() - p_c.ln())).abs() < 1e-12);
    }

    #[test]
    fn test_extract_all() {
        let index = index();
        let mut fx = extractor(&index).with_mlm_fields(BTreeMap::from([
            ("names".to_string(), 0.2),
            ("body".to_string(), 0.8),
        ]));
        let query = Query::new("barack obama honolulu");
        let features = fx.extract("<dbpedia:Barack_Obama>", "barack obama", &query);
        let names: Vec<&str> = features.keys().map(String::as_str).collect();
        assert_eq!(names, fx.feature_names());
        assert_eq!(features[FTR_TEM], 1.0);
        assert!(features[FTR_MLM_SCORE] > 0.0);
        assert!(!fx.cache().is_empty());
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(jaccard("barack obama", "obama"), 0.5);
        assert_eq!(jaccard("", ""), 0.0);
    }
}
