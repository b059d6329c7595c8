//! Learned ranking for entity linking.
//!
//! Training happens offline; this module only applies a trained tree
//! ensemble to feature vectors:
//!
//! - [`instance`]: the (mention, entity, query) unit with its feature map,
//!   and its JSON / RankLib encodings,
//! - [`models`]: the JSON tree-ensemble artifact (gradient-boosted or random
//!   forest, regression or classification),
//! - [`ranker`]: the adapter assigning scores to a batch of instances.

pub mod instance;
pub mod models;
pub mod ranker;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use instance::{Instance, Instances};
pub use models::{RankingModel, TreeEnsemble};
pub use ranker::Ranker;

/// Learning task of a ranking model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// The score is the predicted value.
    Regression,
    /// The target is the predicted label; the score is the positive-class
    /// probability.
    Classification,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Regression => write!(f, "regression"),
            Category::Classification => write!(f, "classification"),
        }
    }
}

/// Machine learning error types.
#[derive(Debug, thiserror::Error)]
pub enum MlError {
    #[error("Instances have heterogeneous feature sets (first mismatch: {instance_id})")]
    HeterogeneousFeatures { instance_id: String },

    #[error("Model expects features {expected:?}, instances have {actual:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Invalid feature vector: {message}")]
    InvalidFeatureVector { message: String },

    #[error("Model loading failed: {path}: {message}")]
    ModelLoadError { path: String, message: String },

    #[error("Invalid model: {message}")]
    InvalidModel { message: String },

    #[error("Model is a {actual} model, {expected} was configured")]
    CategoryMismatch { expected: Category, actual: Category },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serde() {
        let c: Category = serde_json::from_str("\"classification\"").unwrap();
        assert_eq!(c, Category::Classification);
        assert_eq!(Category::Regression.to_string(), "regression");
    }

    #[test]
    fn test_error_messages() {
        let err = MlError::CategoryMismatch {
            expected: Category::Regression,
            actual: Category::Classification,
        };
        assert_eq!(
            err.to_string(),
            "Model is a classification model, regression was configured"
        );
    }
}
