//! Trained ranking models.
//!
//! Models are trained offline and shipped as a JSON tree ensemble:
//!
//! ```json
//! {"kind": "gbrt", "category": "regression",
//!  "feature_names": ["commonness", "mention_len"],
//!  "learning_rate": 0.1, "init": 0.0,
//!  "trees": [{"nodes": [{"feature": 0, "threshold": 0.5, "left": 1, "right": 2},
//!                       {"value": -1.0}, {"value": 1.0}]}]}
//! ```
//!
//! Each tree is a flat node list rooted at index 0; child indices always
//! point forward. A sample goes left when `x[feature] <= threshold`.

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ml::{Category, MlError};

/// A model assigning scores to feature vectors.
pub trait RankingModel: Send + Sync + std::fmt::Debug {
    /// Learning task the model was trained for.
    fn category(&self) -> Category;

    /// Feature names, in the order `predict` expects values.
    fn feature_names(&self) -> &[String];

    /// Raw prediction (regression value, or positive-class probability for
    /// classifiers).
    fn predict(&self, features: &[f64]) -> Result<f64>;

    /// Predicted label together with the positive-class probability.
    fn predict_class(&self, features: &[f64]) -> Result<(String, f64)> {
        let p = self.predict(features)?;
        let label = if p >= 0.5 { "1" } else { "0" };
        Ok((label.to_string(), p))
    }
}

/// Ensemble flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnsembleKind {
    /// Gradient-boosted regression trees.
    Gbrt,
    /// Random forest.
    Rf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        DecisionTree { nodes }
    }

    fn validate(&self, num_features: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("empty tree".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                threshold,
            } = node
            {
                if *feature >= num_features {
                    return Err(format!("node {i}: feature index {feature} out of range"));
                }
                if !threshold.is_finite() {
                    return Err(format!("node {i}: threshold is not finite"));
                }
                for child in [left, right] {
                    if *child <= i || *child >= self.nodes.len() {
                        return Err(format!("node {i}: invalid child index {child}"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Leaf value reached by `features`. Assumes a validated tree.
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

fn default_learning_rate() -> f64 {
    1.0
}

/// Tree-ensemble ranking model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    kind: EnsembleKind,
    category: Category,
    feature_names: Vec<String>,
    #[serde(default = "default_learning_rate")]
    learning_rate: f64,
    #[serde(default)]
    init: f64,
    trees: Vec<DecisionTree>,
}

impl TreeEnsemble {
    pub fn new(
        kind: EnsembleKind,
        category: Category,
        feature_names: Vec<String>,
        learning_rate: f64,
        init: f64,
        trees: Vec<DecisionTree>,
    ) -> Result<Self> {
        let model = TreeEnsemble {
            kind,
            category,
            feature_names,
            learning_rate,
            init,
            trees,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let model: TreeEnsemble =
            serde_json::from_str(json).map_err(|e| MlError::InvalidModel {
                message: e.to_string(),
            })?;
        model.validate()?;
        Ok(model)
    }

    /// Load a model artifact from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |message: String| MlError::ModelLoadError {
            path: path.display().to_string(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let model: TreeEnsemble =
            serde_json::from_str(&content).map_err(|e| load_error(e.to_string()))?;
        model.validate()?;
        info!(
            "Loaded {:?} {} model with {} trees from {}",
            model.kind,
            model.category,
            model.trees.len(),
            path.display()
        );
        Ok(model)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn kind(&self) -> EnsembleKind {
        self.kind
    }

    fn validate(&self) -> std::result::Result<(), MlError> {
        if self.trees.is_empty() {
            return Err(MlError::InvalidModel {
                message: "ensemble has no trees".to_string(),
            });
        }
        if !self.feature_names.windows(2).all(|w| w[0] < w[1]) {
            return Err(MlError::InvalidModel {
                message: "feature names must be sorted and distinct".to_string(),
            });
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_names.len())
                .map_err(|message| MlError::InvalidModel {
                    message: format!("tree {i}: {message}"),
                })?;
        }
        Ok(())
    }

    fn raw_score(&self, features: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        match self.kind {
            EnsembleKind::Gbrt => self.init + self.learning_rate * sum,
            EnsembleKind::Rf => sum / self.trees.len() as f64,
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl RankingModel for TreeEnsemble {
    fn category(&self) -> Category {
        self.category
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.feature_names.len() {
            return Err(MlError::InvalidFeatureVector {
                message: format!(
                    "expected {} values, got {}",
                    self.feature_names.len(),
                    features.len()
                ),
            }
            .into());
        }
        let raw = self.raw_score(features);
        Ok(match (self.category, self.kind) {
            (Category::Classification, EnsembleKind::Gbrt) => sigmoid(raw),
            _ => raw,
        })
    }
}
