//! Learning instances and their file formats.
//!
//! An instance is identified by an id and carries a target (label), a score
//! assigned by a model, a feature map and free-form properties (query id,
//! mention, entity id, ...).
//!
//! JSON format, one entry per instance:
//!
//! ```json
//! {"q1-0": {"target": "0", "score": 0.83,
//!           "features": {"commonness": 0.9, "mention_len": 2},
//!           "properties": {"qid": "q1", "mention": "barack obama", "en_id": "<dbpedia:Barack_Obama>"}}}
//! ```
//!
//! RankLib format: `<target> qid:<qid> 1:<v> 2:<v> ... # <id>`, features in
//! alphabetical order.

use std::collections::BTreeMap;
use std::path::Path;

use log::info;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::ml::MlError;

fn default_target() -> String {
    "0".to_string()
}

fn deserialize_target<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => default_target(),
        other => other.to_string(),
    })
}

fn deserialize_score<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<f64>, D::Error> {
    match Value::deserialize(d)? {
        Value::Number(n) => Ok(n.as_f64()),
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!("invalid score: {other}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct InstanceBody {
    #[serde(default = "default_target", deserialize_with = "deserialize_target")]
    target: String,
    #[serde(default, deserialize_with = "deserialize_score")]
    score: Option<f64>,
    #[serde(default)]
    features: BTreeMap<String, f64>,
    #[serde(default)]
    properties: BTreeMap<String, Value>,
}

/// A single learning instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    id: String,
    /// Target id or class label.
    pub target: String,
    /// Score assigned by a model.
    pub score: Option<f64>,
    features: BTreeMap<String, f64>,
    properties: BTreeMap<String, Value>,
}

impl Instance {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Instance {
            id: id.into(),
            target: default_target(),
            score: None,
            features: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn features(&self) -> &BTreeMap<String, f64> {
        &self.features
    }

    pub fn set_features(&mut self, features: BTreeMap<String, f64>) {
        self.features = features;
    }

    pub fn add_feature<S: Into<String>>(&mut self, name: S, value: f64) {
        self.features.insert(name.into(), value);
    }

    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    pub fn add_property<S: Into<String>, V: Into<Value>>(&mut self, name: S, value: V) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// A property as text; numbers are rendered in their JSON form.
    pub fn property_str(&self, name: &str) -> Option<String> {
        match self.properties.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Score, or 0 when unscored.
    pub fn score_or_zero(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }

    fn body(&self) -> InstanceBody {
        InstanceBody {
            target: self.target.clone(),
            score: self.score,
            features: self.features.clone(),
            properties: self.properties.clone(),
        }
    }

    fn from_body(id: String, body: InstanceBody) -> Self {
        Instance {
            id,
            target: body.target,
            score: body.score,
            features: body.features,
            properties: body.properties,
        }
    }

    /// JSON form `{id: {target, score, features, properties}}`.
    pub fn to_json(&self) -> Result<Value> {
        let mut map = serde_json::Map::new();
        map.insert(self.id.clone(), serde_json::to_value(self.body())?);
        Ok(Value::Object(map))
    }

    /// RankLib line over the given features.
    pub fn to_ranklib(&self, features: &[String], qid: &str) -> String {
        let mut out = format!("{} qid:{}", self.target, qid);
        for (i, name) in features.iter().enumerate() {
            let value = self.features.get(name).copied().unwrap_or(0.0);
            out.push_str(&format!(" {}:{}", i + 1, value));
        }
        out.push_str(&format!(" # {}", self.id));
        out
    }
}

/// An ordered collection of instances.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Instances {
    instances: Vec<Instance>,
}

impl Instances {
    pub fn new(instances: Vec<Instance>) -> Self {
        Instances { instances }
    }

    pub fn push(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    pub fn extend<I: IntoIterator<Item = Instance>>(&mut self, instances: I) {
        self.instances.extend(instances);
    }

    pub fn get(&self, id: &str) -> Option<&Instance> {
        self.instances.iter().find(|ins| ins.id == id)
    }

    pub fn all(&self) -> &[Instance] {
        &self.instances
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Instance> {
        self.instances.iter_mut()
    }

    pub fn into_vec(self) -> Vec<Instance> {
        self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// The shared, alphabetically sorted feature vocabulary.
    ///
    /// Fails when any instance has a different feature set than the first.
    pub fn feature_names(&self) -> std::result::Result<Vec<String>, MlError> {
        let Some(first) = self.instances.first() else {
            return Ok(Vec::new());
        };
        let names: Vec<String> = first.features.keys().cloned().collect();
        for ins in &self.instances[1..] {
            if !ins.features.keys().eq(names.iter()) {
                return Err(MlError::HeterogeneousFeatures {
                    instance_id: ins.id.clone(),
                });
            }
        }
        Ok(names)
    }

    /// Group instances by the textual value of a property. Instances without
    /// the property are left out.
    pub fn group_by_property(&self, property: &str) -> BTreeMap<String, Instances> {
        let mut groups: BTreeMap<String, Instances> = BTreeMap::new();
        for ins in &self.instances {
            if let Some(value) = ins.property_str(property) {
                groups.entry(value).or_default().push(ins.clone());
            }
        }
        groups
    }

    pub fn to_json(&self) -> Result<Value> {
        let mut map = serde_json::Map::new();
        for ins in &self.instances {
            map.insert(ins.id.clone(), serde_json::to_value(ins.body())?);
        }
        Ok(Value::Object(map))
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.to_json()?)?;
        std::fs::write(path, json)?;
        info!("Instances written to {}", path.display());
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let bodies: BTreeMap<String, InstanceBody> = serde_json::from_str(json)?;
        Ok(Instances::new(
            bodies
                .into_iter()
                .map(|(id, body)| Instance::from_body(id, body))
                .collect(),
        ))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// RankLib lines sorted by query id, preceded by a header naming the
    /// features. The query id is taken from `qid_prop`, or is the instance
    /// id when no property is given.
    pub fn to_ranklib(&self, qid_prop: Option<&str>) -> Result<String> {
        let features = self.feature_names()?;

        let mut rows: Vec<(String, &Instance)> = self
            .instances
            .iter()
            .map(|ins| {
                let qid = match qid_prop {
                    Some(prop) => ins.property_str(prop).unwrap_or_default(),
                    None => ins.id.clone(),
                };
                (qid, ins)
            })
            .collect();
        rows.sort_by(|(a, _), (b, _)| {
            match (a.parse::<u64>(), b.parse::<u64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => a.cmp(b),
            }
        });

        let mut out = String::from("# target instance_Id");
        for name in &features {
            out.push(' ');
            out.push_str(name);
        }
        out.push('\n');
        for (qid, ins) in rows {
            out.push_str(&ins.to_ranklib(&features, &qid));
            out.push('\n');
        }
        Ok(out)
    }
}

impl FromIterator<Instance> for Instances {
    fn from_iter<I: IntoIterator<Item = Instance>>(iter: I) -> Self {
        Instances::new(iter.into_iter().collect())
    }
}

impl IntoIterator for Instances {
    type Item = Instance;
    type IntoIter = std::vec::IntoIter<Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.instances.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn instance(id: &str, qid: &str, features: &[(&str, f64)]) -> Instance {
        let mut ins = Instance::new(id);
        for (name, value) in features {
            ins.add_feature(*name, *value);
        }
        ins.add_property("qid", qid);
        ins
    }

    #[test]
    fn test_json_format() {
        let mut ins = instance("q1-0", "q1", &[("commonness", 0.5)]);
        ins.score = Some(0.25);
        let json = ins.to_json().unwrap();
        assert_eq!(
            json,
            json!({"q1-0": {"target": "0", "score": 0.25,
                            "features": {"commonness": 0.5},
                            "properties": {"qid": "q1"}}})
        );
    }

    #[test]
    fn test_from_json_accepts_legacy_values() {
        let inss = Instances::from_json_str(
            r#"{"a": {"target": 1, "score": "", "features": {"f": 2}},
                "b": {"score": "0.5"}}"#,
        )
        .unwrap();
        let a = inss.get("a").unwrap();
        assert_eq!(a.target, "1");
        assert_eq!(a.score, None);
        assert_eq!(a.feature("f"), Some(2.0));
        let b = inss.get("b").unwrap();
        assert_eq!(b.target, "0");
        assert_eq!(b.score, Some(0.5));
    }

    #[test]
    fn test_feature_names_homogeneous() {
        let inss = Instances::new(vec![
            instance("1", "q1", &[("b", 1.0), ("a", 2.0)]),
            instance("2", "q1", &[("a", 0.0), ("b", 0.0)]),
        ]);
        assert_eq!(inss.feature_names().unwrap(), vec!["a", "b"]);

        let mixed = Instances::new(vec![
            instance("1", "q1", &[("a", 1.0)]),
            instance("2", "q1", &[("a", 1.0), ("c", 1.0)]),
        ]);
        match mixed.feature_names() {
            Err(MlError::HeterogeneousFeatures { instance_id }) => assert_eq!(instance_id, "2"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_ranklib_format() {
        let mut inss = Instances::new(vec![
            instance("b", "10", &[("y", 0.5), ("x", 1.0)]),
            instance("a", "2", &[("x", 0.0), ("y", 0.25)]),
        ]);
        inss.iter_mut().next().unwrap().target = "1".to_string();

        let out = inss.to_ranklib(Some("qid")).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "# target instance_Id x y");
        assert_eq!(lines[1], "0 qid:2 1:0 2:0.25 # a");
        assert_eq!(lines[2], "1 qid:10 1:1 2:0.5 # b");
    }

    #[test]
    fn test_group_by_property() {
        let inss = Instances::new(vec![
            instance("1", "q2", &[]),
            instance("2", "q1", &[]),
            instance("3", "q2", &[]),
            Instance::new("4"),
        ]);
        let groups = inss.group_by_property("qid");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["q2"].len(), 2);
        assert_eq!(groups["q1"].all()[0].id(), "2");
    }

    #[test]
    fn test_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inss.json");
        let inss = Instances::new(vec![instance("1", "q1", &[("a", 1.5)])]);
        inss.to_json_file(&path).unwrap();
        assert_eq!(Instances::from_json_file(&path).unwrap(), inss);
    }
}
