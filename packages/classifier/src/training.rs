//! Fits a complete [`ModelBundle`] from a labelled feature table.

use case_records_case_models::FeatureTable;

use crate::{ClassifierError, ForestConfig, LabelCodec, ModelBundle, Pipeline};

/// Minimum number of rows required to fit a model.
pub const MIN_TRAINING_ROWS: usize = 5;

/// Fits a fresh codec and pipeline on `table` and records training-set
/// accuracy.
///
/// # Errors
///
/// * [`ClassifierError::InsufficientData`] if `table` has fewer than
///   [`MIN_TRAINING_ROWS`] rows
/// * [`ClassifierError::SingleClass`] if every row has the same label
pub fn train(table: &FeatureTable, config: &ForestConfig) -> Result<ModelBundle, ClassifierError> {
    if table.len() < MIN_TRAINING_ROWS {
        return Err(ClassifierError::InsufficientData {
            rows: table.len(),
            required: MIN_TRAINING_ROWS,
        });
    }

    let labels = table.labels();
    let codec = LabelCodec::fit(&labels);
    if codec.len() < 2 {
        return Err(ClassifierError::SingleClass {
            class: labels.first().copied().unwrap_or_default().to_string(),
        });
    }
    let codes = codec.encode_all(labels.iter().copied())?;
    let rows = table.features();

    let pipeline = Pipeline::fit(&rows, &codes, codec.len(), config);

    let predicted = pipeline.predict(&rows);
    let correct = predicted.iter().zip(&codes).filter(|(p, c)| p == c).count();
    #[allow(clippy::cast_precision_loss)]
    let accuracy = correct as f64 / rows.len() as f64;

    log::info!(
        "Trained model on {} row(s), {} class(es): training accuracy {accuracy:.4}",
        rows.len(),
        codec.len()
    );

    ModelBundle::new(pipeline, codec, Some(accuracy))
}

#[cfg(test)]
mod tests {
    use case_records_case_models::{FeatureRow, LabeledRow};

    use super::*;

    fn labeled(age: u32, case_type: &str) -> LabeledRow {
        LabeledRow {
            features: FeatureRow {
                age,
                ethnicity: "Parda".to_string(),
                location: "Centro".to_string(),
            },
            case_type: case_type.to_string(),
        }
    }

    #[test]
    fn refuses_fewer_than_minimum_rows() {
        let table: FeatureTable = (0..4).map(|i| labeled(20 + i, "Furto")).collect();
        let err = train(&table, &ForestConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::InsufficientData {
                rows: 4,
                required: MIN_TRAINING_ROWS
            }
        ));
    }

    #[test]
    fn refuses_a_single_class() {
        let table: FeatureTable = (0..6).map(|i| labeled(20 + i, "Furto")).collect();
        let err = train(&table, &ForestConfig::default()).unwrap_err();
        assert!(matches!(err, ClassifierError::SingleClass { class } if class == "Furto"));
    }

    #[test]
    fn records_accuracy_and_sorted_classes() {
        let table: FeatureTable = [
            labeled(10, "Tráfico"),
            labeled(12, "Tráfico"),
            labeled(14, "Tráfico"),
            labeled(60, "Assalto"),
            labeled(62, "Assalto"),
            labeled(64, "Assalto"),
        ]
        .into_iter()
        .collect();

        let bundle = train(&table, &ForestConfig::default()).unwrap();
        assert_eq!(bundle.classes(), ["Assalto", "Tráfico"]);
        assert!((bundle.accuracy().unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(
            bundle
                .predict_labels(&[table.rows()[0].features.clone()])
                .unwrap(),
            ["Tráfico"]
        );
    }
}
