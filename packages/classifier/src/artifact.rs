//! The persisted model bundle: fitted pipeline, label codec, and training
//! accuracy, serialized together as `MessagePack`.

use std::path::Path;

use case_records_case_models::FeatureRow;
use serde::{Deserialize, Serialize};

use crate::{ClassifierError, LabelCodec, Pipeline};

/// Default path of the model artifact.
pub const DEFAULT_MODEL_PATH: &str = "data/model.msgpack";

/// A trained pipeline together with the codec its class codes refer to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pipeline: Pipeline,
    codec: LabelCodec,
    /// Fraction of training rows predicted correctly, if recorded.
    accuracy: Option<f64>,
}

impl ModelBundle {
    /// Bundles a fitted pipeline with its codec.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::Corrupt`] if the codec's class count does
    /// not match the pipeline's output width.
    pub fn new(
        pipeline: Pipeline,
        codec: LabelCodec,
        accuracy: Option<f64>,
    ) -> Result<Self, ClassifierError> {
        let bundle = Self {
            pipeline,
            codec,
            accuracy,
        };
        bundle.check_consistency()?;
        Ok(bundle)
    }

    fn check_consistency(&self) -> Result<(), ClassifierError> {
        if self.codec.len() != self.pipeline.n_classes() {
            return Err(ClassifierError::Corrupt {
                message: format!(
                    "codec has {} class(es) but classifier outputs {}",
                    self.codec.len(),
                    self.pipeline.n_classes()
                ),
            });
        }
        Ok(())
    }

    /// Loads a bundle from `path`.
    ///
    /// # Errors
    ///
    /// * [`ClassifierError::Io`] if the file cannot be read
    /// * [`ClassifierError::Decode`] if it is not a valid artifact
    /// * [`ClassifierError::Corrupt`] if it decodes but is inconsistent
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let bytes = std::fs::read(path)?;
        let bundle: Self = rmp_serde::from_slice(&bytes)?;
        bundle.check_consistency()?;

        log::info!(
            "Loaded model from {} ({} classes, {} features)",
            path.display(),
            bundle.codec.len(),
            bundle.pipeline.feature_names().len()
        );
        Ok(bundle)
    }

    /// Writes the bundle to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::Encode`] or [`ClassifierError::Io`] on
    /// failure.
    pub fn save(&self, path: &Path) -> Result<(), ClassifierError> {
        let bytes = rmp_serde::to_vec_named(self)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &bytes)?;

        log::info!("Saved model to {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// The fitted pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The label codec.
    #[must_use]
    pub const fn codec(&self) -> &LabelCodec {
        &self.codec
    }

    /// Training accuracy, if recorded.
    #[must_use]
    pub const fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    /// Class labels in code order.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        self.codec.classes()
    }

    /// Per-class probabilities for each row, aligned to [`Self::classes`].
    #[must_use]
    pub fn predict_proba(&self, rows: &[FeatureRow]) -> Vec<Vec<f64>> {
        self.pipeline.predict_proba(rows)
    }

    /// Predicted labels for each row.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::Codec`] if the classifier emits a code the
    /// codec cannot decode.
    pub fn predict_labels(&self, rows: &[FeatureRow]) -> Result<Vec<String>, ClassifierError> {
        self.pipeline
            .predict(rows)
            .into_iter()
            .map(|code| Ok(self.codec.decode(code)?.to_string()))
            .collect()
    }

    /// `(feature name, importance)` pairs in expanded-feature order.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        self.pipeline.feature_importances()
    }
}

#[cfg(test)]
mod tests {
    use case_records_case_models::{FeatureTable, LabeledRow};

    use super::*;
    use crate::{ForestConfig, train};

    fn table() -> FeatureTable {
        [
            (10, "Branca", "Centro", "Furto"),
            (14, "Parda", "Centro", "Furto"),
            (16, "Branca", "Bairro A", "Furto"),
            (50, "Preta", "Zona Rural", "Homicídio"),
            (55, "Parda", "Zona Rural", "Homicídio"),
            (60, "Preta", "Bairro B", "Homicídio"),
        ]
        .into_iter()
        .map(|(age, ethnicity, location, case_type)| LabeledRow {
            features: FeatureRow {
                age,
                ethnicity: ethnicity.to_string(),
                location: location.to_string(),
            },
            case_type: case_type.to_string(),
        })
        .collect()
    }

    fn config() -> ForestConfig {
        ForestConfig {
            n_trees: 20,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn save_and_load_preserve_predictions() {
        let table = table();
        let bundle = train(&table, &config()).unwrap();

        let dir = std::env::temp_dir().join(format!("case_records_model_{}", std::process::id()));
        let path = dir.join("model.msgpack");
        bundle.save(&path).unwrap();
        let loaded = ModelBundle::load(&path).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        let rows = table.features();
        assert_eq!(loaded.classes(), bundle.classes());
        assert_eq!(loaded.accuracy(), bundle.accuracy());
        assert_eq!(loaded.predict_proba(&rows), bundle.predict_proba(&rows));
        assert_eq!(
            loaded.predict_labels(&rows).unwrap(),
            bundle.predict_labels(&rows).unwrap()
        );
    }

    #[test]
    fn rejects_mismatched_codec() {
        let bundle = train(&table(), &config()).unwrap();
        let err = ModelBundle::new(
            bundle.pipeline().clone(),
            LabelCodec::fit(["Furto", "Homicídio", "Tráfico"]),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ClassifierError::Corrupt { .. }));
    }

    #[test]
    fn missing_artifact_is_io_error() {
        let err = ModelBundle::load(Path::new("/nonexistent/case_records/model.msgpack"))
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Io(_)));
    }

    #[test]
    fn garbage_artifact_is_decode_error() {
        let path = std::env::temp_dir().join(format!(
            "case_records_garbage_{}.msgpack",
            std::process::id()
        ));
        std::fs::write(&path, b"not a model").unwrap();
        let err = ModelBundle::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ClassifierError::Decode(_)));
    }
}
