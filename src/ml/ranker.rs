//! Applies a trained model to a batch of instances.

use std::sync::Arc;

use log::debug;

use crate::error::Result;
use crate::ml::{Category, Instances, MlError, RankingModel};

#[derive(Debug, Clone)]
pub struct Ranker {
    model: Arc<dyn RankingModel>,
}

impl Ranker {
    pub fn new(model: Arc<dyn RankingModel>) -> Self {
        Ranker { model }
    }

    /// Wrap `model`, failing when it was trained for another task.
    pub fn with_category(model: Arc<dyn RankingModel>, expected: Category) -> Result<Self> {
        let actual = model.category();
        if actual != expected {
            return Err(MlError::CategoryMismatch { expected, actual }.into());
        }
        Ok(Ranker { model })
    }

    pub fn category(&self) -> Category {
        self.model.category()
    }

    /// Score every instance in place.
    ///
    /// Regression models set `score`; classifiers set `target` to the
    /// predicted label and `score` to the positive-class probability.
    pub fn apply(&self, instances: &mut Instances) -> Result<()> {
        if instances.is_empty() {
            return Ok(());
        }
        let vocabulary = instances.feature_names()?;
        if vocabulary.as_slice() != self.model.feature_names() {
            return Err(MlError::FeatureMismatch {
                expected: self.model.feature_names().to_vec(),
                actual: vocabulary,
            }
            .into());
        }

        let category = self.model.category();
        for ins in instances.iter_mut() {
            let vector: Vec<f64> = ins.features().values().copied().collect();
            match category {
                Category::Regression => {
                    ins.score = Some(self.model.predict(&vector)?);
                }
                Category::Classification => {
                    let (label, p) = self.model.predict_class(&vector)?;
                    ins.target = label;
                    ins.score = Some(p);
                }
            }
        }
        debug!("Ranked {} instances", instances.len());
        Ok(())
    }
}
