//! Preprocessing chained with the random forest.

use case_records_case_models::FeatureRow;
use serde::{Deserialize, Serialize};

use crate::encoder::Preprocessor;
use crate::forest::{ForestConfig, RandomForest};

/// A fitted preprocessing + classifier pipeline. Output probability vectors
/// are indexed by class code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    preprocessor: Preprocessor,
    forest: RandomForest,
}

impl Pipeline {
    /// Fits preprocessing and the forest on `rows` labelled with `codes`
    /// (each in `0..n_classes`).
    #[must_use]
    pub fn fit(
        rows: &[FeatureRow],
        codes: &[usize],
        n_classes: usize,
        config: &ForestConfig,
    ) -> Self {
        let preprocessor = Preprocessor::fit(rows);
        let x = preprocessor.transform(rows);
        let forest = RandomForest::fit(&x, codes, n_classes, config);

        log::debug!(
            "Fitted pipeline: {} row(s), {} expanded feature(s), {} class(es), {} tree(s)",
            rows.len(),
            preprocessor.n_features(),
            n_classes,
            forest.trees().len()
        );

        Self {
            preprocessor,
            forest,
        }
    }

    /// Per-class probabilities for each row.
    #[must_use]
    pub fn predict_proba(&self, rows: &[FeatureRow]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|r| {
                self.forest
                    .predict_proba_row(&self.preprocessor.transform_row(r))
            })
            .collect()
    }

    /// Predicted class code for each row.
    #[must_use]
    pub fn predict(&self, rows: &[FeatureRow]) -> Vec<usize> {
        rows.iter()
            .map(|r| self.forest.predict_row(&self.preprocessor.transform_row(r)))
            .collect()
    }

    /// Number of classes the forest outputs.
    #[must_use]
    pub const fn n_classes(&self) -> usize {
        self.forest.n_classes()
    }

    /// Expanded feature names, categorical levels first then numeric.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        self.preprocessor.feature_names()
    }

    /// `(feature name, importance)` pairs in expanded-feature order.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        self.feature_names()
            .into_iter()
            .zip(self.forest.feature_importances())
            .collect()
    }
}
